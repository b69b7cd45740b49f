//! Agente del conductor
//!
//! Cada tick pide un fix a la fuente de posición, lo reporta y, si el bus
//! quedó dentro del radio de la siguiente parada, avanza pasando la parada
//! actual que observó. Los errores transitorios pierden el tick y se
//! reintenta en el siguiente, sin backoff.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::{Coordinates, TripState};
use crate::services::geolocation::{GeolocationError, PositionSource};
use crate::services::proximity::should_auto_advance;
use crate::services::trip_service::TripUpdate;
use crate::utils::errors::{AppError, AppResult};

pub const DEFAULT_INTERVAL_SECS: u64 = 10;
pub const MIN_INTERVAL_SECS: u64 = 5;
pub const MAX_INTERVAL_SECS: u64 = 10;

/// Operaciones de viaje que el agente necesita del backend
#[async_trait]
pub trait TripClient: Send + Sync {
    async fn start_trip(&self, route_id: Uuid, position: Coordinates) -> AppResult<TripState>;

    async fn report_position(&self, route_id: Uuid, position: Coordinates) -> AppResult<TripUpdate>;

    async fn advance_stop(&self, route_id: Uuid, expected_current_stop_id: Uuid) -> AppResult<TripUpdate>;
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub route_id: Uuid,
    pub interval: Duration,
}

impl AgentConfig {
    pub fn new(route_id: Uuid, interval_secs: u64) -> Self {
        Self {
            route_id,
            interval: clamp_interval(interval_secs),
        }
    }
}

/// Intervalo de reporte acotado a 5..=10 s
pub fn clamp_interval(secs: u64) -> Duration {
    Duration::from_secs(secs.clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    GeolocationDenied,
    GeolocationUnavailable,
    /// Backend caído o saturado; se reintenta en el próximo tick
    Backend,
    /// El backend rechazó el reporte (sesión vencida, datos inválidos)
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Reported { applied: bool, advanced: bool },
    Skipped(SkipReason),
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentExit {
    TripFinished,
    Shutdown,
}

/// El viaje ya no admite escrituras de este conductor
fn ends_trip(error: &AppError) -> bool {
    matches!(
        error,
        AppError::InvalidTransition(_) | AppError::Forbidden(_) | AppError::NotFound(_)
    )
}

pub struct DriverAgent<C, P> {
    client: C,
    source: P,
    config: AgentConfig,
}

impl<C: TripClient, P: PositionSource> DriverAgent<C, P> {
    pub fn new(client: C, source: P, config: AgentConfig) -> Self {
        Self { client, source, config }
    }

    /// Toma la ruta con el primer fix disponible
    pub async fn start(&mut self) -> AppResult<TripState> {
        let position = self
            .source
            .current_position()
            .await
            .map_err(|e| AppError::BadRequest(format!("cannot start trip without a position: {}", e)))?;

        let state = self.client.start_trip(self.config.route_id, position).await?;
        info!(
            "🚌 Viaje en curso: {} (parada actual: {})",
            state.route_name,
            state.current_stop.as_ref().map_or("-", |stop| stop.name.as_str())
        );
        Ok(state)
    }

    pub async fn tick(&mut self) -> TickOutcome {
        let position = match self.source.current_position().await {
            Ok(position) => position,
            Err(GeolocationError::PermissionDenied) => {
                warn!("⚠️ Permiso de ubicación denegado, se omite el reporte");
                return TickOutcome::Skipped(SkipReason::GeolocationDenied);
            }
            Err(GeolocationError::Unavailable) => {
                debug!("Posición no disponible en este tick");
                return TickOutcome::Skipped(SkipReason::GeolocationUnavailable);
            }
        };

        let update = match self.client.report_position(self.config.route_id, position).await {
            Ok(update) => update,
            Err(e) if ends_trip(&e) => {
                info!("🏁 El viaje ya no acepta reportes: {}", e);
                return TickOutcome::Finished;
            }
            Err(e) if e.is_transient() => {
                warn!("⚠️ Reporte de posición perdido: {}", e);
                return TickOutcome::Skipped(SkipReason::Backend);
            }
            Err(e) => {
                error!("❌ Reporte de posición rechazado: {}", e);
                return TickOutcome::Skipped(SkipReason::Rejected);
            }
        };

        if update.state.is_completed() {
            return TickOutcome::Finished;
        }

        let (current, next) = match (&update.state.current_stop, &update.state.next_stop) {
            (Some(current), Some(next)) => (current, next),
            _ => {
                return TickOutcome::Reported {
                    applied: update.applied,
                    advanced: false,
                }
            }
        };

        if !should_auto_advance(position, next) {
            return TickOutcome::Reported {
                applied: update.applied,
                advanced: false,
            };
        }

        info!("📍 Llegando a '{}', avance automático", next.name);
        match self.client.advance_stop(self.config.route_id, current.id).await {
            Ok(advanced) if advanced.state.is_completed() => TickOutcome::Finished,
            Ok(advanced) => TickOutcome::Reported {
                applied: update.applied,
                advanced: advanced.applied,
            },
            Err(e) if ends_trip(&e) => TickOutcome::Finished,
            Err(e) => {
                warn!("⚠️ Avance automático perdido, se reintenta en el próximo tick: {}", e);
                TickOutcome::Reported {
                    applied: update.applied,
                    advanced: false,
                }
            }
        }
    }

    /// Corre hasta que el viaje termine o llegue la señal de apagado
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> AgentExit {
        if *shutdown.borrow() {
            return AgentExit::Shutdown;
        }

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("🛑 Agente detenido");
                        return AgentExit::Shutdown;
                    }
                }
                _ = ticker.tick() => {
                    if self.tick().await == TickOutcome::Finished {
                        info!("🏁 Viaje terminado, agente detenido");
                        return AgentExit::TripFinished;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::models::{RouteStatus, Stop, UserRole};
    use crate::services::change_feed::ChangeFeed;
    use crate::services::geolocation::ReplayPositionSource;
    use crate::services::test_support::{create_user, memory_repo, seed_route};
    use crate::services::trip_service::TripService;

    /// Cliente en proceso sobre el servicio real
    struct InProcessClient {
        service: Arc<TripService>,
        driver_id: Uuid,
    }

    #[async_trait]
    impl TripClient for InProcessClient {
        async fn start_trip(&self, route_id: Uuid, position: Coordinates) -> AppResult<TripState> {
            self.service.start_trip(self.driver_id, route_id, position, None).await
        }

        async fn report_position(&self, route_id: Uuid, position: Coordinates) -> AppResult<TripUpdate> {
            self.service.report_position(self.driver_id, route_id, position, None).await
        }

        async fn advance_stop(&self, route_id: Uuid, expected_current_stop_id: Uuid) -> AppResult<TripUpdate> {
            self.service
                .advance_stop(self.driver_id, route_id, Some(expected_current_stop_id))
                .await
        }
    }

    /// Backend caído: cuenta los intentos
    struct DownClient {
        attempts: AtomicUsize,
        session_expired: bool,
    }

    impl DownClient {
        fn new(session_expired: bool) -> Self {
            Self {
                attempts: AtomicUsize::new(0),
                session_expired,
            }
        }
    }

    #[async_trait]
    impl TripClient for DownClient {
        async fn start_trip(&self, _route_id: Uuid, _position: Coordinates) -> AppResult<TripState> {
            Err(AppError::TransientBackend("connection refused".to_string()))
        }

        async fn report_position(&self, _route_id: Uuid, _position: Coordinates) -> AppResult<TripUpdate> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.session_expired {
                return Err(AppError::Unauthorized("Session expired".to_string()));
            }
            Err(AppError::TransientBackend("connection refused".to_string()))
        }

        async fn advance_stop(&self, _route_id: Uuid, _expected: Uuid) -> AppResult<TripUpdate> {
            Err(AppError::TransientBackend("connection refused".to_string()))
        }
    }

    fn at(stop: &Stop) -> Coordinates {
        stop.coordinates().unwrap()
    }

    async fn agent_on_route(
        names: &[&str],
        fixes: impl Fn(&[Stop]) -> Vec<Coordinates>,
    ) -> (DriverAgent<InProcessClient, ReplayPositionSource>, Arc<TripService>, Vec<Stop>, Uuid) {
        let repo = memory_repo();
        let (route, stops) = seed_route(&repo, "AUNDH", names).await;
        let driver = create_user(&repo, "niranjan@campus.edu", UserRole::Driver).await;
        let service = Arc::new(TripService::new(repo, ChangeFeed::default()));

        let client = InProcessClient {
            service: service.clone(),
            driver_id: driver.id,
        };
        let config = AgentConfig {
            route_id: route.id,
            interval: Duration::from_millis(5),
        };
        let agent = DriverAgent::new(client, ReplayPositionSource::new(fixes(&stops)), config);
        (agent, service, stops, route.id)
    }

    #[test]
    fn test_interval_is_clamped() {
        assert_eq!(clamp_interval(1), Duration::from_secs(5));
        assert_eq!(clamp_interval(7), Duration::from_secs(7));
        assert_eq!(clamp_interval(60), Duration::from_secs(10));
        assert_eq!(AgentConfig::new(Uuid::new_v4(), DEFAULT_INTERVAL_SECS).interval, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_arriving_at_next_stop_advances() {
        let (mut agent, _, stops, _) =
            agent_on_route(&["Aundh Gaon", "Sangavi Phata", "Pimple Gurav", "SBUP"], |stops| {
                vec![at(&stops[0]), at(&stops[1])]
            })
            .await;

        let state = agent.start().await.unwrap();
        assert_eq!(state.current_stop.unwrap().id, stops[0].id);

        assert_eq!(
            agent.tick().await,
            TickOutcome::Reported {
                applied: true,
                advanced: true
            }
        );
    }

    #[tokio::test]
    async fn test_far_from_next_stop_only_reports() {
        let (mut agent, service, stops, route_id) =
            agent_on_route(&["Aundh Gaon", "Sangavi Phata", "SBUP"], |stops| {
                vec![at(&stops[0]), Coordinates::new(18.70, 73.90)]
            })
            .await;

        agent.start().await.unwrap();
        assert_eq!(
            agent.tick().await,
            TickOutcome::Reported {
                applied: true,
                advanced: false
            }
        );
        let state = service.trip_state(route_id).await.unwrap();
        assert_eq!(state.current_stop.unwrap().id, stops[0].id);
    }

    #[tokio::test]
    async fn test_run_until_trip_completes() {
        let (mut agent, service, stops, route_id) =
            agent_on_route(&["Aundh Gaon", "Sangavi Phata", "SBUP"], |stops| {
                stops.iter().map(at).collect()
            })
            .await;

        agent.start().await.unwrap();
        let (_tx, rx) = watch::channel(false);
        assert_eq!(agent.run(rx).await, AgentExit::TripFinished);

        let state = service.trip_state(route_id).await.unwrap();
        assert_eq!(state.status, RouteStatus::Completed);
        assert_eq!(state.current_stop.unwrap().id, stops[2].id);
    }

    #[tokio::test]
    async fn test_denied_permission_skips_without_stopping() {
        let repo = memory_repo();
        let (route, stops) = seed_route(&repo, "TALEGAON", &["Talegaon", "Somatane Phata", "SBUP"]).await;
        let driver = create_user(&repo, "sumit@campus.edu", UserRole::Driver).await;
        let service = Arc::new(TripService::new(repo, ChangeFeed::default()));
        service
            .start_trip(driver.id, route.id, at(&stops[0]), None)
            .await
            .unwrap();

        let source = ReplayPositionSource::from_json(r#"["denied", "unavailable", {"latitude": 18.65, "longitude": 73.9}]"#)
            .unwrap();
        let client = InProcessClient {
            service,
            driver_id: driver.id,
        };
        let mut agent = DriverAgent::new(client, source, AgentConfig::new(route.id, 5));

        assert_eq!(agent.tick().await, TickOutcome::Skipped(SkipReason::GeolocationDenied));
        assert_eq!(agent.tick().await, TickOutcome::Skipped(SkipReason::GeolocationUnavailable));
        assert!(matches!(agent.tick().await, TickOutcome::Reported { applied: true, .. }));
    }

    #[tokio::test]
    async fn test_backend_errors_are_retried_next_tick() {
        let client = DownClient::new(false);
        let source = ReplayPositionSource::new(vec![Coordinates::new(18.6298, 73.7997)]);
        let mut agent = DriverAgent::new(
            client,
            source,
            AgentConfig {
                route_id: Uuid::new_v4(),
                interval: Duration::from_millis(5),
            },
        );

        assert_eq!(agent.tick().await, TickOutcome::Skipped(SkipReason::Backend));
        assert_eq!(agent.tick().await, TickOutcome::Skipped(SkipReason::Backend));
        assert_eq!(agent.client.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rejected_report_is_not_counted_as_outage() {
        let source = ReplayPositionSource::new(vec![Coordinates::new(18.6298, 73.7997)]);
        let mut agent = DriverAgent::new(
            DownClient::new(true),
            source,
            AgentConfig {
                route_id: Uuid::new_v4(),
                interval: Duration::from_millis(5),
            },
        );

        assert_eq!(agent.tick().await, TickOutcome::Skipped(SkipReason::Rejected));
        assert_eq!(agent.client.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_completed_trip_finishes_agent() {
        let (mut agent, service, _, route_id) =
            agent_on_route(&["Aundh Gaon", "SBUP"], |_| vec![Coordinates::new(18.70, 73.90)]).await;

        let driver_id = agent.client.driver_id;
        agent.start().await.unwrap();
        service.complete_trip(driver_id, route_id).await.unwrap();

        assert_eq!(agent.tick().await, TickOutcome::Finished);
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_agent() {
        let client = DownClient::new(false);
        let source = ReplayPositionSource::new(Vec::new());
        let mut agent = DriverAgent::new(
            client,
            source,
            AgentConfig {
                route_id: Uuid::new_v4(),
                interval: Duration::from_millis(5),
            },
        );

        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            let _ = tx.send(true);
        });

        assert_eq!(agent.run(rx).await, AgentExit::Shutdown);
    }
}
