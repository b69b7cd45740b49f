use axum::{
    body::Bytes,
    extract::{Path, State},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::controllers::trip_controller::TripController;
use crate::dto::trip_dto::{AdvanceStopRequest, PositionReportRequest, StartTripRequest};
use crate::dto::ApiResponse;
use crate::middleware::auth::{require_driver, session_middleware};
use crate::models::{Session, TripState};
use crate::services::trip_service::TripUpdate;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Operaciones del conductor; sesión con rol driver obligatoria
pub fn create_trip_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/active", get(active_trip))
        .route("/:route_id/start", post(start_trip))
        .route("/:route_id/position", post(report_position))
        .route("/:route_id/advance", post(advance_stop))
        .route("/:route_id/complete", post(complete_trip))
        .route_layer(from_fn(require_driver))
        .route_layer(from_fn_with_state(state, session_middleware))
}

async fn start_trip(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(route_id): Path<Uuid>,
    Json(request): Json<StartTripRequest>,
) -> Result<Json<ApiResponse<TripState>>, AppError> {
    let controller = TripController::new(&state);
    Ok(Json(controller.start(&session, route_id, request).await?))
}

async fn report_position(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(route_id): Path<Uuid>,
    Json(request): Json<PositionReportRequest>,
) -> Result<Json<ApiResponse<TripUpdate>>, AppError> {
    let controller = TripController::new(&state);
    Ok(Json(controller.report_position(&session, route_id, request).await?))
}

async fn advance_stop(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(route_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<ApiResponse<TripUpdate>>, AppError> {
    let request = AdvanceStopRequest::from_body(&body)?;
    let controller = TripController::new(&state);
    Ok(Json(controller.advance(&session, route_id, request).await?))
}

async fn complete_trip(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(route_id): Path<Uuid>,
) -> Result<Json<ApiResponse<TripState>>, AppError> {
    let controller = TripController::new(&state);
    Ok(Json(controller.complete(&session, route_id).await?))
}

async fn active_trip(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<ApiResponse<Option<TripState>>>, AppError> {
    let controller = TripController::new(&state);
    Ok(Json(controller.active(&session).await?))
}
