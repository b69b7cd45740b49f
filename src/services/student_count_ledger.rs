//! Registro de conteos de estudiantes por parada
//!
//! Solo inserción. El conteo vigente de una parada es el último reportado:
//! nunca se suma ni se promedia.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::models::{Stop, StudentCount};
use crate::repositories::ShuttleRepository;
use crate::services::change_feed::{ChangeFeed, ChangedTable, RouteChange};
use crate::utils::errors::{field_error, not_found_error, AppResult};
use crate::utils::validation::validate_non_negative;

pub struct StudentCountLedger {
    repo: Arc<dyn ShuttleRepository>,
    feed: ChangeFeed,
}

impl StudentCountLedger {
    pub fn new(repo: Arc<dyn ShuttleRepository>, feed: ChangeFeed) -> Self {
        Self { repo, feed }
    }

    async fn stop(&self, stop_id: Uuid) -> AppResult<Stop> {
        self.repo
            .find_stop(stop_id)
            .await?
            .ok_or_else(|| not_found_error("Stop", &stop_id.to_string()))
    }

    pub async fn report(&self, stop_id: Uuid, count: i32) -> AppResult<StudentCount> {
        validate_non_negative(count).map_err(|e| field_error("count", e))?;

        let stop = self.stop(stop_id).await?;
        let row = self.repo.insert_student_count(stop.id, count).await?;

        info!("🧍 {} estudiantes en parada '{}'", count, stop.name);
        self.feed.publish(RouteChange::now(stop.route_id, ChangedTable::StudentCounts));

        Ok(row)
    }

    /// `None` si nadie reportó todavía (se muestra como 0)
    pub async fn current_count(&self, stop_id: Uuid) -> AppResult<Option<i32>> {
        let stop = self.stop(stop_id).await?;
        let latest = self.repo.latest_student_count(stop.id).await?;
        Ok(latest.map(|row| row.count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{memory_repo, seed_route};
    use crate::utils::errors::AppError;

    #[tokio::test]
    async fn test_latest_report_wins() {
        let repo = memory_repo();
        let (_, stops) = seed_route(&repo, "AUNDH", &["Aundh Gaon", "Sangavi Phata"]).await;
        let ledger = StudentCountLedger::new(repo, ChangeFeed::default());

        for count in [3, 7, 2] {
            ledger.report(stops[0].id, count).await.unwrap();
        }

        assert_eq!(ledger.current_count(stops[0].id).await.unwrap(), Some(2));
        assert_eq!(ledger.current_count(stops[1].id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_negative_count_is_rejected() {
        let repo = memory_repo();
        let (_, stops) = seed_route(&repo, "AUNDH", &["Aundh Gaon"]).await;
        let ledger = StudentCountLedger::new(repo, ChangeFeed::default());

        let err = ledger.report(stops[0].id, -1).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(ledger.current_count(stops[0].id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_stop_is_not_found() {
        let ledger = StudentCountLedger::new(memory_repo(), ChangeFeed::default());
        let err = ledger.report(Uuid::new_v4(), 4).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_report_notifies_route_subscribers() {
        let repo = memory_repo();
        let (route, stops) = seed_route(&repo, "TALEGAON", &["Talegaon", "SBUP"]).await;
        let feed = ChangeFeed::default();
        let mut subscription = feed.subscribe_route(route.id);
        let ledger = StudentCountLedger::new(repo, feed);

        ledger.report(stops[1].id, 5).await.unwrap();

        let change = subscription.next_change().await.unwrap();
        assert_eq!(change.table, ChangedTable::StudentCounts);
    }
}
