//! Router de la API
//!
//! Cada feature expone su `create_*_router`; aquí se componen bajo `/api`
//! con CORS y trazas HTTP.

pub mod admin_routes;
pub mod auth_routes;
pub mod route_routes;
pub mod student_count_routes;
pub mod tracking_routes;
pub mod trip_routes;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::middleware::cors::cors_layer;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth_routes::create_auth_router(state.clone()))
        .merge(route_routes::create_route_router())
        .nest("/trips", trip_routes::create_trip_router(state.clone()))
        .nest("/tracking", tracking_routes::create_tracking_router())
        .nest("/stops", student_count_routes::create_student_count_router(state.clone()))
        .nest("/admin", admin_routes::create_admin_router(state.clone()));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_origins)),
        )
        .with_state(state)
}

/// Endpoint de salud
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
