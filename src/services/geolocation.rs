//! Fuentes de posición del dispositivo del conductor

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::models::Coordinates;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeolocationError {
    /// El usuario negó el permiso: aviso visible, no fatal
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable")]
    Unavailable,
}

#[async_trait]
pub trait PositionSource: Send {
    async fn current_position(&mut self) -> Result<Coordinates, GeolocationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ReplayFailure {
    Denied,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum ReplayEntry {
    Fix(Coordinates),
    Failure(ReplayFailure),
}

/// Reproduce una secuencia grabada de fixes (JSON). Al agotarse repite el último fix.
#[derive(Debug, Clone)]
pub struct ReplayPositionSource {
    entries: Vec<ReplayEntry>,
    cursor: usize,
    last_fix: Option<Coordinates>,
}

impl ReplayPositionSource {
    pub fn new(fixes: Vec<Coordinates>) -> Self {
        Self {
            entries: fixes.into_iter().map(ReplayEntry::Fix).collect(),
            cursor: 0,
            last_fix: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            entries: serde_json::from_str(json)?,
            cursor: 0,
            last_fix: None,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing {}", path.display()))
    }
}

#[async_trait]
impl PositionSource for ReplayPositionSource {
    async fn current_position(&mut self) -> Result<Coordinates, GeolocationError> {
        let entry = match self.entries.get(self.cursor) {
            Some(entry) => entry.clone(),
            None => return self.last_fix.ok_or(GeolocationError::Unavailable),
        };
        self.cursor += 1;

        match entry {
            ReplayEntry::Fix(position) => {
                self.last_fix = Some(position);
                Ok(position)
            }
            ReplayEntry::Failure(ReplayFailure::Denied) => Err(GeolocationError::PermissionDenied),
            ReplayEntry::Failure(ReplayFailure::Unavailable) => Err(GeolocationError::Unavailable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replay_mixed_entries() {
        let mut source = ReplayPositionSource::from_json(
            r#"[
                {"latitude": 18.6298, "longitude": 73.7997},
                "denied",
                "unavailable",
                {"latitude": 18.6310, "longitude": 73.8001}
            ]"#,
        )
        .unwrap();

        assert_eq!(source.current_position().await, Ok(Coordinates::new(18.6298, 73.7997)));
        assert_eq!(source.current_position().await, Err(GeolocationError::PermissionDenied));
        assert_eq!(source.current_position().await, Err(GeolocationError::Unavailable));
        assert_eq!(source.current_position().await, Ok(Coordinates::new(18.6310, 73.8001)));
        // agotado: repite el último fix
        assert_eq!(source.current_position().await, Ok(Coordinates::new(18.6310, 73.8001)));
    }

    #[tokio::test]
    async fn test_empty_replay_is_unavailable() {
        let mut source = ReplayPositionSource::new(Vec::new());
        assert_eq!(source.current_position().await, Err(GeolocationError::Unavailable));
    }

    #[test]
    fn test_unknown_status_fails_to_parse() {
        assert!(ReplayPositionSource::from_json(r#"["teleported"]"#).is_err());
    }
}
