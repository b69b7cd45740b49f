use axum::{
    extract::{Path, State},
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::student_count_controller::StudentCountController;
use crate::dto::student_count_dto::{ReportCountRequest, StopCountResponse};
use crate::dto::ApiResponse;
use crate::middleware::auth::session_middleware;
use crate::models::StudentCount;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Leer el conteo es público; reportarlo exige sesión
pub fn create_student_count_router(state: AppState) -> Router<AppState> {
    let report = post(report_count).route_layer(from_fn_with_state(state, session_middleware));

    Router::new().route("/:stop_id/count", get(current_count).merge(report))
}

async fn current_count(
    State(state): State<AppState>,
    Path(stop_id): Path<Uuid>,
) -> Result<Json<ApiResponse<StopCountResponse>>, AppError> {
    let controller = StudentCountController::new(&state);
    Ok(Json(controller.current(stop_id).await?))
}

async fn report_count(
    State(state): State<AppState>,
    Path(stop_id): Path<Uuid>,
    Json(request): Json<ReportCountRequest>,
) -> Result<Json<ApiResponse<StudentCount>>, AppError> {
    let controller = StudentCountController::new(&state);
    Ok(Json(controller.report(stop_id, request).await?))
}
