//! Servicio de viajes
//!
//! Lee el estado, consulta la máquina de estados y ejecuta la escritura
//! condicional. Si la escritura no aplica, vuelve a leer para saber si el
//! conductor perdió una carrera o si el reporte simplemente llegó tarde.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Coordinates, Route, TripState, User};
use crate::repositories::{BeginTrip, ClaimOutcome, PositionReport, ShuttleRepository, StopAdvance};
use crate::services::change_feed::{ChangeFeed, ChangedTable, RouteChange};
use crate::services::trip_state_machine::{
    plan_advance, plan_complete, plan_position, plan_start, AdvancePlan, StartPlan, TripError,
};
use crate::utils::errors::{field_error, AppError, AppResult};
use crate::utils::validation::validate_coordinates;

/// Estado resultante y si la escritura se aplicó
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TripUpdate {
    pub state: TripState,
    pub applied: bool,
}

pub struct TripService {
    repo: Arc<dyn ShuttleRepository>,
    feed: ChangeFeed,
}

impl TripService {
    pub fn new(repo: Arc<dyn ShuttleRepository>, feed: ChangeFeed) -> Self {
        Self { repo, feed }
    }

    async fn route(&self, route_id: Uuid) -> AppResult<Route> {
        self.repo
            .find_route(route_id)
            .await?
            .ok_or_else(|| TripError::RouteNotFound(route_id).into())
    }

    async fn driver(&self, driver_id: Uuid) -> AppResult<User> {
        self.repo
            .find_user(driver_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Unknown user".to_string()))
    }

    pub async fn trip_state(&self, route_id: Uuid) -> AppResult<TripState> {
        let route = self.route(route_id).await?;
        let stops = self.repo.list_stops(route_id).await?;
        let location = self.repo.find_bus_location(route_id).await?;
        Ok(TripState::from_parts(&route, &stops, location.as_ref()))
    }

    fn notify(&self, route_id: Uuid, tables: &[ChangedTable]) {
        for table in tables {
            self.feed.publish(RouteChange::now(route_id, *table));
        }
    }

    pub async fn start_trip(
        &self,
        driver_id: Uuid,
        route_id: Uuid,
        position: Coordinates,
        driver_mobile: Option<String>,
    ) -> AppResult<TripState> {
        validate_coordinates(position.latitude, position.longitude).map_err(|e| field_error("position", e))?;

        let driver = self.driver(driver_id).await?;
        let route = self.route(route_id).await?;
        let stops = self.repo.list_stops(route_id).await?;

        let StartPlan { first_stop_id, reentry } = plan_start(&route, &stops, &driver)?;

        let outcome = self
            .repo
            .begin_trip(BeginTrip {
                route_id,
                driver_id,
                driver_name: driver.name.clone(),
                driver_mobile,
                position,
                first_stop_id,
                at: Utc::now(),
            })
            .await?;

        match outcome {
            ClaimOutcome::Claimed(_) if reentry => {
                info!("🔁 {} reinicia la ruta '{}' desde la primera parada", driver.name, route.name);
                self.notify(route_id, &[ChangedTable::BusLocations]);
            }
            ClaimOutcome::Claimed(_) => {
                info!("🚌 Viaje iniciado: ruta '{}' por {}", route.name, driver.name);
                self.notify(route_id, &[ChangedTable::Routes, ChangedTable::BusLocations]);
            }
            ClaimOutcome::HeldBy(held) => {
                warn!("⚠️ Ruta '{}' ya tomada por otro conductor", held.name);
                return Err(TripError::HeldByAnotherDriver {
                    route_id,
                    driver_id: held.driver_id,
                }
                .into());
            }
            ClaimOutcome::RouteNotFound => return Err(TripError::RouteNotFound(route_id).into()),
        }

        self.trip_state(route_id).await
    }

    /// Gana el reporte más reciente según el reloj del dispositivo; un reporte
    /// viejo se descarta sin error. Iniciar o avanzar no mueve esa marca.
    pub async fn report_position(
        &self,
        driver_id: Uuid,
        route_id: Uuid,
        position: Coordinates,
        reported_at: Option<DateTime<Utc>>,
    ) -> AppResult<TripUpdate> {
        validate_coordinates(position.latitude, position.longitude).map_err(|e| field_error("position", e))?;

        let route = self.route(route_id).await?;
        plan_position(&route, driver_id)?;

        let applied = self
            .repo
            .record_position(PositionReport {
                route_id,
                driver_id,
                position,
                reported_at,
                received_at: Utc::now(),
            })
            .await?;

        if applied {
            self.notify(route_id, &[ChangedTable::BusLocations]);
        } else {
            // ¿reporte tardío o el viaje ya no es de este conductor?
            plan_position(&self.route(route_id).await?, driver_id)?;
            debug!("Reporte de posición descartado por viejo en ruta {}", route_id);
        }

        Ok(TripUpdate {
            state: self.trip_state(route_id).await?,
            applied,
        })
    }

    /// Idempotente respecto a `expected_current_stop_id`: dos disparos para la
    /// misma parada avanzan una sola vez.
    pub async fn advance_stop(
        &self,
        driver_id: Uuid,
        route_id: Uuid,
        expected_current_stop_id: Option<Uuid>,
    ) -> AppResult<TripUpdate> {
        let route = self.route(route_id).await?;
        let stops = self.repo.list_stops(route_id).await?;
        let location = self.repo.find_bus_location(route_id).await?;

        let applied = match plan_advance(&route, &stops, location.as_ref(), driver_id, expected_current_stop_id)? {
            AdvancePlan::AlreadyAdvanced => false,
            AdvancePlan::Advance {
                from_stop_id,
                to_stop_id,
                completes_trip,
            } => {
                let moved = self
                    .repo
                    .advance_stop(StopAdvance {
                        route_id,
                        driver_id,
                        from_stop_id,
                        to_stop_id,
                        completes_trip,
                        at: Utc::now(),
                    })
                    .await?;

                if !moved {
                    plan_position(&self.route(route_id).await?, driver_id).or_else(|err| match err {
                        // El avance concurrente que completó el viaje ya hizo el trabajo
                        TripError::NotActive { .. } => Ok(()),
                        other => Err(other),
                    })?;
                } else if completes_trip {
                    info!("🏁 Ruta '{}' completada", route.name);
                    self.notify(route_id, &[ChangedTable::BusLocations, ChangedTable::Routes]);
                } else {
                    self.notify(route_id, &[ChangedTable::BusLocations]);
                }

                moved
            }
        };

        Ok(TripUpdate {
            state: self.trip_state(route_id).await?,
            applied,
        })
    }

    pub async fn complete_trip(&self, driver_id: Uuid, route_id: Uuid) -> AppResult<TripState> {
        let route = self.route(route_id).await?;
        plan_complete(&route, driver_id)?;

        match self.repo.finish_trip(route_id, driver_id).await? {
            Some(finished) => {
                info!("🏁 Ruta '{}' completada manualmente", finished.name);
                self.notify(route_id, &[ChangedTable::Routes]);
            }
            None => plan_complete(&self.route(route_id).await?, driver_id)?,
        }

        self.trip_state(route_id).await
    }

    /// El viaje en curso del conductor, si lo hay (para reanudar tras recargar)
    pub async fn active_trip(&self, driver_id: Uuid) -> AppResult<Option<TripState>> {
        let driver = self.driver(driver_id).await?;

        let route_id = match driver.active_route_id {
            Some(route_id) => route_id,
            None => return Ok(None),
        };

        match self.repo.find_route(route_id).await? {
            Some(route) if route.is_active_for(driver_id) => Ok(Some(self.trip_state(route_id).await?)),
            _ => Ok(None),
        }
    }
}
