use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{BoxStream, StreamExt};
use tracing::warn;
use uuid::Uuid;

use crate::dto::ApiResponse;
use crate::models::TrackingView;
use crate::services::tracking_service::TrackingService;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct TrackingController {
    service: TrackingService,
}

impl TrackingController {
    pub fn new(state: &AppState) -> Self {
        Self {
            service: TrackingService::new(state.repo.clone(), state.feed.clone()),
        }
    }

    pub async fn view(&self, route_id: Uuid) -> Result<ApiResponse<TrackingView>, AppError> {
        Ok(ApiResponse::success(self.service.view(route_id).await?))
    }

    /// Eventos `tracking` con la vista completa; un fallo de lectura se emite
    /// como evento `error` y el stream sigue vivo.
    pub async fn stream(
        &self,
        route_id: Uuid,
    ) -> Result<Sse<BoxStream<'static, Result<Event, Infallible>>>, AppError> {
        let views = self.service.watch(route_id).await?;

        let events = views.map(move |view| {
            let event = match view {
                Ok(view) => Event::default().event("tracking").json_data(&view),
                Err(e) => {
                    warn!("⚠️ Error recalculando seguimiento de {}: {}", route_id, e);
                    Ok(Event::default().event("error").data(e.to_string()))
                }
            };
            Ok(event.unwrap_or_else(|e| Event::default().event("error").data(e.to_string())))
        });

        Ok(Sse::new(events.boxed()).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
    }
}
