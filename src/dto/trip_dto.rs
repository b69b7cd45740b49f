use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::Coordinates;
use crate::utils::errors::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StartTripRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[validate(length(max = 20))]
    pub driver_mobile: Option<String>,
}

impl StartTripRequest {
    pub fn position(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

// Las coordenadas se validan en el servicio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionReportRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// Momento del fix en el dispositivo; por defecto, la hora de llegada
    pub reported_at: Option<DateTime<Utc>>,
}

impl PositionReportRequest {
    pub fn position(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvanceStopRequest {
    /// Parada actual que vio quien dispara el avance
    pub expected_current_stop_id: Option<Uuid>,
}

impl AdvanceStopRequest {
    /// Cuerpo vacío = avanzar sin guarda; un cuerpo presente tiene que ser válido
    pub fn from_body(body: &[u8]) -> AppResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("Invalid advance request: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_advance_body_has_no_guard() {
        assert!(AdvanceStopRequest::from_body(b"").unwrap().expected_current_stop_id.is_none());
        assert!(AdvanceStopRequest::from_body(b" \n").unwrap().expected_current_stop_id.is_none());
        assert!(AdvanceStopRequest::from_body(b"{}").unwrap().expected_current_stop_id.is_none());
    }

    #[test]
    fn test_malformed_advance_body_is_rejected() {
        let bodies: [&[u8]; 3] = [br#"{"expected_current_stop_id":"stale-stop"}"#, b"not json", b"[1]"];
        for body in bodies {
            let err = AdvanceStopRequest::from_body(body).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
        }
    }

    #[test]
    fn test_advance_body_with_guard() {
        let stop = Uuid::new_v4();
        let body = serde_json::to_vec(&serde_json::json!({ "expected_current_stop_id": stop })).unwrap();
        assert_eq!(AdvanceStopRequest::from_body(&body).unwrap().expected_current_stop_id, Some(stop));
    }
}
