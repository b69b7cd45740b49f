use uuid::Uuid;

use crate::dto::route_dto::{RouteDetailResponse, RouteListQuery, SeedReport};
use crate::dto::ApiResponse;
use crate::models::{Route, ShiftInfo, ShiftNumber};
use crate::repositories::ShuttleRepository;
use crate::services::seed_service::{SeedData, SeedService};
use crate::state::AppState;
use crate::utils::errors::{not_found_error, AppError};
use std::sync::Arc;

pub struct RouteController {
    repo: Arc<dyn ShuttleRepository>,
}

impl RouteController {
    pub fn new(state: &AppState) -> Self {
        Self {
            repo: state.repo.clone(),
        }
    }

    pub async fn list_shifts(&self) -> Result<ApiResponse<Vec<ShiftInfo>>, AppError> {
        Ok(ApiResponse::success(self.repo.list_shifts().await?))
    }

    pub async fn list_routes(&self, query: RouteListQuery) -> Result<ApiResponse<Vec<Route>>, AppError> {
        let shift = query
            .shift
            .map(ShiftNumber::try_from)
            .transpose()
            .map_err(AppError::BadRequest)?;

        Ok(ApiResponse::success(self.repo.list_routes(shift).await?))
    }

    pub async fn get_route(&self, route_id: Uuid) -> Result<ApiResponse<RouteDetailResponse>, AppError> {
        let route = self
            .repo
            .find_route(route_id)
            .await?
            .ok_or_else(|| not_found_error("Route", &route_id.to_string()))?;
        let stops = self.repo.list_stops(route_id).await?;

        Ok(ApiResponse::success(RouteDetailResponse { route, stops }))
    }

    pub async fn seed(&self) -> Result<ApiResponse<SeedReport>, AppError> {
        let report = SeedService::new(self.repo.clone()).seed(&SeedData::bundled()?).await?;
        let message = if report.seeded { "Routes seeded" } else { "Routes already exist" };
        Ok(ApiResponse::success_with_message(report, message.to_string()))
    }
}
