use axum::{
    extract::State,
    middleware::{from_fn, from_fn_with_state},
    routing::post,
    Json, Router,
};

use crate::controllers::route_controller::RouteController;
use crate::dto::route_dto::SeedReport;
use crate::dto::ApiResponse;
use crate::middleware::auth::{require_admin, session_middleware};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/seed", post(seed))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state, session_middleware))
}

async fn seed(State(state): State<AppState>) -> Result<Json<ApiResponse<SeedReport>>, AppError> {
    let controller = RouteController::new(&state);
    Ok(Json(controller.seed().await?))
}
