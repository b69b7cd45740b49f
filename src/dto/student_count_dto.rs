use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReportCountRequest {
    #[validate(range(min = 0, message = "count must be >= 0"))]
    pub count: i32,
}

// Conteo vigente de una parada (0 si nadie reportó)
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StopCountResponse {
    pub stop_id: Uuid,
    pub count: i32,
    pub reported: bool,
}
