use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::route_controller::RouteController;
use crate::dto::route_dto::{RouteDetailResponse, RouteListQuery};
use crate::dto::ApiResponse;
use crate::models::{Route, ShiftInfo};
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Catálogo público de turnos y rutas
pub fn create_route_router() -> Router<AppState> {
    Router::new()
        .route("/shifts", get(list_shifts))
        .route("/routes", get(list_routes))
        .route("/routes/:route_id", get(get_route))
}

async fn list_shifts(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<ShiftInfo>>>, AppError> {
    let controller = RouteController::new(&state);
    Ok(Json(controller.list_shifts().await?))
}

async fn list_routes(
    State(state): State<AppState>,
    Query(query): Query<RouteListQuery>,
) -> Result<Json<ApiResponse<Vec<Route>>>, AppError> {
    let controller = RouteController::new(&state);
    Ok(Json(controller.list_routes(query).await?))
}

async fn get_route(
    State(state): State<AppState>,
    Path(route_id): Path<Uuid>,
) -> Result<Json<ApiResponse<RouteDetailResponse>>, AppError> {
    let controller = RouteController::new(&state);
    Ok(Json(controller.get_route(route_id).await?))
}
