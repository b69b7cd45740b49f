//! Siembra del catálogo de rutas y paradas
//!
//! Idempotente: si ya hay alguna ruta no hace nada. Las paradas se insertan
//! en cada ruta que comparte nombre (cada turno tiene sus propias filas).

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::dto::route_dto::SeedReport;
use crate::models::{NewRoute, NewStop};
use crate::repositories::ShuttleRepository;
use crate::utils::errors::{field_error, AppError, AppResult};
use crate::utils::validation::{validate_dense_sequence, validate_not_empty};

/// Catálogo incluido en el binario
const BUNDLED_SEED: &str = include_str!("../../data/seed_routes.json");

#[derive(Debug, Clone, Deserialize)]
pub struct SeedData {
    pub routes: Vec<NewRoute>,
    /// Paradas por nombre de ruta
    pub stops: HashMap<String, Vec<NewStop>>,
}

impl SeedData {
    pub fn bundled() -> AppResult<Self> {
        serde_json::from_str(BUNDLED_SEED).map_err(|e| AppError::Internal(format!("invalid seed data: {}", e)))
    }

    fn validate(&self) -> AppResult<()> {
        for route in &self.routes {
            validate_not_empty(&route.name).map_err(|e| field_error("routes.name", e))?;
        }
        for stops in self.stops.values() {
            let sequence: Vec<i32> = stops.iter().map(|stop| stop.sequence_number).collect();
            validate_dense_sequence(&sequence).map_err(|e| field_error("stops.sequence_number", e))?;
        }
        Ok(())
    }
}

pub struct SeedService {
    repo: Arc<dyn ShuttleRepository>,
}

impl SeedService {
    pub fn new(repo: Arc<dyn ShuttleRepository>) -> Self {
        Self { repo }
    }

    pub async fn seed(&self, data: &SeedData) -> AppResult<SeedReport> {
        data.validate()?;

        if self.repo.count_routes().await? > 0 {
            info!("🌱 Rutas ya sembradas, se omite");
            return Ok(SeedReport {
                seeded: false,
                routes: 0,
                stops: 0,
            });
        }

        let mut report = SeedReport {
            seeded: true,
            routes: 0,
            stops: 0,
        };

        for new_route in &data.routes {
            let route = self.repo.insert_route(new_route.clone()).await?;
            report.routes += 1;

            match data.stops.get(&route.name) {
                Some(stops) => {
                    let inserted = self.repo.insert_stops(route.id, stops.clone()).await?;
                    report.stops += inserted.len();
                }
                None => warn!("⚠️ Ruta '{}' sin paradas en los datos de siembra", route.name),
            }
        }

        info!("🌱 Sembradas {} rutas y {} paradas", report.routes, report.stops);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShiftNumber;
    use crate::services::test_support::memory_repo;

    #[test]
    fn test_bundled_data_is_well_formed() {
        let data = SeedData::bundled().unwrap();
        assert_eq!(data.routes.len(), 15);
        assert_eq!(data.stops["KALEWADI"].len(), 10);
        assert_eq!(data.stops["KALEWADI"][0].name, "Kalewadi Phata");
        assert!(data.validate().is_ok());
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let repo = memory_repo();
        let service = SeedService::new(repo.clone());
        let data = SeedData::bundled().unwrap();

        let first = service.seed(&data).await.unwrap();
        assert!(first.seeded);
        assert_eq!(first.routes, 15);
        // 5 nombres × 3 turnos, cada uno con su propia secuencia
        assert_eq!(first.stops, 3 * (10 + 8 + 6 + 10 + 9));

        let second = service.seed(&data).await.unwrap();
        assert!(!second.seeded);
        assert_eq!(repo.count_routes().await.unwrap(), 15);
    }

    #[tokio::test]
    async fn test_every_shift_gets_its_own_stops() {
        let repo = memory_repo();
        SeedService::new(repo.clone()).seed(&SeedData::bundled().unwrap()).await.unwrap();

        let shift_three = repo.list_routes(Some(ShiftNumber::try_from(3).unwrap())).await.unwrap();
        assert_eq!(shift_three.len(), 5);
        for route in shift_three {
            assert!(!repo.list_stops(route.id).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_gapped_sequence_is_rejected() {
        let mut data = SeedData::bundled().unwrap();
        if let Some(stops) = data.stops.get_mut("TALEGAON") {
            stops.remove(2);
        }

        let err = SeedService::new(memory_repo()).seed(&data).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
