use uuid::Uuid;
use validator::Validate;

use crate::dto::student_count_dto::{ReportCountRequest, StopCountResponse};
use crate::dto::ApiResponse;
use crate::models::StudentCount;
use crate::services::student_count_ledger::StudentCountLedger;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct StudentCountController {
    ledger: StudentCountLedger,
}

impl StudentCountController {
    pub fn new(state: &AppState) -> Self {
        Self {
            ledger: StudentCountLedger::new(state.repo.clone(), state.feed.clone()),
        }
    }

    pub async fn report(&self, stop_id: Uuid, request: ReportCountRequest) -> Result<ApiResponse<StudentCount>, AppError> {
        request.validate()?;
        let row = self.ledger.report(stop_id, request.count).await?;
        Ok(ApiResponse::success_with_message(row, "Count recorded".to_string()))
    }

    pub async fn current(&self, stop_id: Uuid) -> Result<ApiResponse<StopCountResponse>, AppError> {
        let latest = self.ledger.current_count(stop_id).await?;
        Ok(ApiResponse::success(StopCountResponse {
            stop_id,
            count: latest.unwrap_or(0),
            reported: latest.is_some(),
        }))
    }
}
