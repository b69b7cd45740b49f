//! Cliente HTTP del backend de shuttles
//!
//! Lo usa el agente del conductor. Los errores HTTP se traducen de vuelta a
//! `AppError` según el status, de modo que el agente decide igual que si
//! llamara al servicio en proceso.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::dto::auth_dto::{AuthResponse, LoginRequest};
use crate::dto::trip_dto::{AdvanceStopRequest, PositionReportRequest, StartTripRequest};
use crate::dto::ApiResponse;
use crate::models::{Coordinates, TripState};
use crate::services::driver_agent::TripClient;
use crate::services::trip_service::TripUpdate;
use crate::utils::errors::{AppError, AppResult};

/// Cliente autenticado con el token de una sesión de conductor
pub struct ShuttleApiClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ShuttleApiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Abre sesión y devuelve un cliente con su token
    pub async fn login(base_url: &str, email: &str, password: &str) -> AppResult<Self> {
        let client = Self::new(base_url, String::new());
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let auth: AuthResponse = client
            .send(client.client.post(client.url("/api/auth/login")).json(&request))
            .await?;

        Ok(Self {
            token: auth.token,
            ..client
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> AppResult<T> {
        let request = self.client.post(self.url(path)).bearer_auth(&self.token).json(body);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> AppResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::TransientBackend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let message = body
                .get("message")
                .and_then(|message| message.as_str())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed"))
                .to_string();
            debug!("Respuesta {} del backend: {}", status, message);
            return Err(error_for_status(status, message));
        }

        // login devuelve AuthResponse directo; el resto va envuelto en ApiResponse
        response
            .json::<T>()
            .await
            .map_err(|e| AppError::TransientBackend(format!("invalid response body: {}", e)))
    }

    async fn post_wrapped<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> AppResult<T> {
        let response: ApiResponse<T> = self.post(path, body).await?;
        response
            .data
            .ok_or_else(|| AppError::TransientBackend(format!("empty response from {}", path)))
    }
}

fn error_for_status(status: StatusCode, message: String) -> AppError {
    match status {
        StatusCode::BAD_REQUEST => AppError::BadRequest(message),
        StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
        StatusCode::FORBIDDEN => AppError::Forbidden(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::CONFLICT => AppError::Conflict(message),
        StatusCode::UNPROCESSABLE_ENTITY => AppError::InvalidTransition(message),
        _ => AppError::TransientBackend(format!("{}: {}", status, message)),
    }
}

#[async_trait]
impl TripClient for ShuttleApiClient {
    async fn start_trip(&self, route_id: Uuid, position: Coordinates) -> AppResult<TripState> {
        let body = StartTripRequest {
            latitude: position.latitude,
            longitude: position.longitude,
            driver_mobile: None,
        };
        self.post_wrapped(&format!("/api/trips/{}/start", route_id), &body).await
    }

    async fn report_position(&self, route_id: Uuid, position: Coordinates) -> AppResult<TripUpdate> {
        let body = PositionReportRequest {
            latitude: position.latitude,
            longitude: position.longitude,
            reported_at: Some(Utc::now()),
        };
        self.post_wrapped(&format!("/api/trips/{}/position", route_id), &body).await
    }

    async fn advance_stop(&self, route_id: Uuid, expected_current_stop_id: Uuid) -> AppResult<TripUpdate> {
        let body = AdvanceStopRequest {
            expected_current_stop_id: Some(expected_current_stop_id),
        };
        self.post_wrapped(&format!("/api/trips/{}/advance", route_id), &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_maps_back_to_error_kind() {
        assert!(matches!(
            error_for_status(StatusCode::CONFLICT, "taken".to_string()),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::UNPROCESSABLE_ENTITY, "route is not active".to_string()),
            AppError::InvalidTransition(_)
        ));
        assert!(error_for_status(StatusCode::SERVICE_UNAVAILABLE, "down".to_string()).is_transient());
        assert!(error_for_status(StatusCode::BAD_GATEWAY, "proxy".to_string()).is_transient());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ShuttleApiClient::new("http://localhost:3000/", "token");
        assert_eq!(client.url("/api/trips/active"), "http://localhost:3000/api/trips/active");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transient() {
        // Puerto 9 (discard): nadie escucha en loopback
        let client = ShuttleApiClient::new("http://127.0.0.1:9", "token");
        let err = client
            .report_position(Uuid::new_v4(), Coordinates::new(18.6298, 73.7997))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
