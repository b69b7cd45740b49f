//! Middleware de autenticación
//!
//! Decodifica el JWT, busca la sesión en el store e inyecta `Session` en las
//! extensions de la request. Los guards de rol corren después.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
    Extension,
};
use uuid::Uuid;

use crate::{
    models::{Session, UserRole},
    state::AppState,
    utils::errors::{forbidden_error, AppError},
    utils::jwt::{extract_token_from_header, verify_token},
};

/// Exige una sesión viva
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Authorization token required".to_string()))?;

    let token = extract_token_from_header(auth_header)?;
    let claims = verify_token(token, &state.jwt)?;

    let session_id = Uuid::parse_str(&claims.sid)
        .map_err(|_| AppError::Unauthorized("Invalid session id".to_string()))?;

    let session = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| AppError::Unauthorized("Session expired or logged out".to_string()))?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

fn require_role(session: &Session, role: UserRole, operation: &str) -> Result<(), AppError> {
    if session.role == role {
        Ok(())
    } else {
        Err(forbidden_error(operation, &format!("requires role {}", role.as_str())))
    }
}

pub async fn require_driver(
    Extension(session): Extension<Session>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_role(&session, UserRole::Driver, "operate trips")?;
    Ok(next.run(request).await)
}

pub async fn require_admin(
    Extension(session): Extension<Session>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_role(&session, UserRole::Admin, "administer")?;
    Ok(next.run(request).await)
}
