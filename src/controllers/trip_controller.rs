use uuid::Uuid;
use validator::Validate;

use crate::dto::trip_dto::{AdvanceStopRequest, PositionReportRequest, StartTripRequest};
use crate::dto::ApiResponse;
use crate::models::{Session, TripState};
use crate::services::trip_service::{TripService, TripUpdate};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct TripController {
    service: TripService,
}

impl TripController {
    pub fn new(state: &AppState) -> Self {
        Self {
            service: TripService::new(state.repo.clone(), state.feed.clone()),
        }
    }

    pub async fn start(
        &self,
        session: &Session,
        route_id: Uuid,
        request: StartTripRequest,
    ) -> Result<ApiResponse<TripState>, AppError> {
        request.validate()?;

        let state = self
            .service
            .start_trip(session.user_id, route_id, request.position(), request.driver_mobile)
            .await?;

        Ok(ApiResponse::success_with_message(state, "Trip started".to_string()))
    }

    pub async fn report_position(
        &self,
        session: &Session,
        route_id: Uuid,
        request: PositionReportRequest,
    ) -> Result<ApiResponse<TripUpdate>, AppError> {
        let update = self
            .service
            .report_position(session.user_id, route_id, request.position(), request.reported_at)
            .await?;

        Ok(ApiResponse::success(update))
    }

    pub async fn advance(
        &self,
        session: &Session,
        route_id: Uuid,
        request: AdvanceStopRequest,
    ) -> Result<ApiResponse<TripUpdate>, AppError> {
        let update = self
            .service
            .advance_stop(session.user_id, route_id, request.expected_current_stop_id)
            .await?;

        Ok(ApiResponse::success(update))
    }

    pub async fn complete(&self, session: &Session, route_id: Uuid) -> Result<ApiResponse<TripState>, AppError> {
        let state = self.service.complete_trip(session.user_id, route_id).await?;
        Ok(ApiResponse::success_with_message(state, "Trip completed".to_string()))
    }

    pub async fn active(&self, session: &Session) -> Result<ApiResponse<Option<TripState>>, AppError> {
        Ok(ApiResponse::success(self.service.active_trip(session.user_id).await?))
    }
}
