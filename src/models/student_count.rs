use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Conteo de estudiantes reportado en una parada (solo inserción)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct StudentCount {
    pub id: Uuid,
    pub stop_id: Uuid,
    pub count: i32,
    pub created_at: DateTime<Utc>,
}
