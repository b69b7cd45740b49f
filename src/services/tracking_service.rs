//! Seguimiento para estudiantes
//!
//! Carga la foto consistente de la ruta y deriva la vista. El stream emite la
//! vista actual y luego una vista recalculada por cada aviso de la ruta.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use uuid::Uuid;

use crate::models::TrackingView;
use crate::repositories::ShuttleRepository;
use crate::services::change_feed::ChangeFeed;
use crate::services::tracking_read_model::derive_tracking_view;
use crate::utils::errors::{not_found_error, AppResult};

#[derive(Clone)]
pub struct TrackingService {
    repo: Arc<dyn ShuttleRepository>,
    feed: ChangeFeed,
}

impl TrackingService {
    pub fn new(repo: Arc<dyn ShuttleRepository>, feed: ChangeFeed) -> Self {
        Self { repo, feed }
    }

    pub async fn view(&self, route_id: Uuid) -> AppResult<TrackingView> {
        let snapshot = self
            .repo
            .load_tracking_snapshot(route_id)
            .await?
            .ok_or_else(|| not_found_error("Route", &route_id.to_string()))?;

        Ok(derive_tracking_view(&snapshot))
    }

    /// Falla de entrada si la ruta no existe; después, cada error de lectura
    /// se emite como elemento y el stream sigue esperando el próximo aviso.
    pub async fn watch(&self, route_id: Uuid) -> AppResult<BoxStream<'static, AppResult<TrackingView>>> {
        // Suscribirse antes de leer para no perder cambios intermedios
        let subscription = self.feed.subscribe_route(route_id);
        let initial = self.view(route_id).await?;

        let updates = stream::unfold((self.clone(), subscription), move |(service, mut subscription)| async move {
            match subscription.next_change().await {
                Some(_) => {
                    let view = service.view(route_id).await;
                    Some((view, (service, subscription)))
                }
                None => None,
            }
        });

        Ok(stream::once(async move { Ok(initial) }).chain(updates).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinates, UserRole};
    use crate::services::test_support::{create_user, memory_repo, seed_route, KALEWADI_STOPS};
    use crate::services::trip_service::TripService;
    use crate::utils::errors::AppError;

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let service = TrackingService::new(memory_repo(), ChangeFeed::default());
        assert!(matches!(service.view(Uuid::new_v4()).await.unwrap_err(), AppError::NotFound(_)));
        assert!(service.watch(Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn test_watch_recomputes_on_each_change() {
        let repo = memory_repo();
        let feed = ChangeFeed::default();
        let (route, _) = seed_route(&repo, "KALEWADI", &KALEWADI_STOPS).await;
        let driver = create_user(&repo, "sopan@campus.edu", UserRole::Driver).await;
        let tracking = TrackingService::new(repo.clone(), feed.clone());
        let trips = TripService::new(repo, feed);

        let mut stream = tracking.watch(route.id).await.unwrap();

        let initial = stream.next().await.unwrap().unwrap();
        assert_eq!(initial.progress_percent, 0.0);

        trips
            .start_trip(driver.id, route.id, Coordinates::new(18.6298, 73.7997), None)
            .await
            .unwrap();

        // start publica dos avisos (routes y bus_locations); basta con el primero
        let after_start = stream.next().await.unwrap().unwrap();
        assert_eq!(after_start.current_stop.unwrap().name, "Kalewadi Phata");
        assert!((after_start.progress_percent - 10.0).abs() < 1e-9);
    }
}
