use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
    Json, Router,
};
use futures::stream::BoxStream;
use uuid::Uuid;

use crate::controllers::tracking_controller::TrackingController;
use crate::dto::ApiResponse;
use crate::models::TrackingView;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Seguimiento público (sin sesión)
pub fn create_tracking_router() -> Router<AppState> {
    Router::new()
        .route("/:route_id", get(tracking_view))
        .route("/:route_id/stream", get(tracking_stream))
}

async fn tracking_view(
    State(state): State<AppState>,
    Path(route_id): Path<Uuid>,
) -> Result<Json<ApiResponse<TrackingView>>, AppError> {
    let controller = TrackingController::new(&state);
    Ok(Json(controller.view(route_id).await?))
}

async fn tracking_stream(
    State(state): State<AppState>,
    Path(route_id): Path<Uuid>,
) -> Result<Sse<BoxStream<'static, Result<Event, Infallible>>>, AppError> {
    let controller = TrackingController::new(&state);
    controller.stream(route_id).await
}
