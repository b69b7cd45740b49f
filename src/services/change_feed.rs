//! Feed de cambios por ruta
//!
//! Canal broadcast en proceso. Con PostgreSQL, un `PgListener` puede además
//! reenviar las notificaciones `shuttle_changes` de los triggers, de modo que
//! otras instancias del servidor también despierten a sus lectores.
//! Un aviso es solo un disparador de "volver a leer": los duplicados no importan.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const NOTIFY_CHANNEL: &str = "shuttle_changes";
const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangedTable {
    Routes,
    BusLocations,
    StudentCounts,
}

/// Aviso de cambio en una ruta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteChange {
    pub route_id: Uuid,
    pub table: ChangedTable,
    pub at: DateTime<Utc>,
}

impl RouteChange {
    pub fn now(route_id: Uuid, table: ChangedTable) -> Self {
        Self {
            route_id,
            table,
            at: Utc::now(),
        }
    }
}

pub type RouteChangeSender = broadcast::Sender<RouteChange>;

#[derive(Clone)]
pub struct ChangeFeed {
    sender: RouteChangeSender,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Sin suscriptores el aviso simplemente se descarta
    pub fn publish(&self, change: RouteChange) {
        debug!("📣 Cambio en ruta {} ({:?})", change.route_id, change.table);
        let _ = self.sender.send(change);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RouteChange> {
        self.sender.subscribe()
    }

    pub fn subscribe_route(&self, route_id: Uuid) -> RouteSubscription {
        RouteSubscription {
            route_id,
            receiver: self.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Suscripción filtrada por `route_id = X`
pub struct RouteSubscription {
    route_id: Uuid,
    receiver: broadcast::Receiver<RouteChange>,
}

impl RouteSubscription {
    /// Espera el próximo cambio de la ruta. Si el lector se quedó atrás se
    /// devuelve un aviso sintético: igual hay que volver a leer. `None` al cerrar.
    pub async fn next_change(&mut self) -> Option<RouteChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) if change.route_id == self.route_id => return Some(change),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Suscriptor de ruta {} perdió {} avisos", self.route_id, skipped);
                    return Some(RouteChange::now(self.route_id, ChangedTable::Routes));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Reenvía las notificaciones de PostgreSQL al feed local.
/// Se reconecta tras un error; termina solo si el feed se descarta.
pub fn spawn_pg_listener(pool: PgPool, feed: ChangeFeed) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match listen(&pool, &feed).await {
                Ok(()) => return,
                Err(e) => {
                    warn!("⚠️ Listener de {} caído: {}. Reintentando en 5s", NOTIFY_CHANNEL, e);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    })
}

async fn listen(pool: &PgPool, feed: &ChangeFeed) -> Result<(), sqlx::Error> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(NOTIFY_CHANNEL).await?;
    info!("👂 Escuchando notificaciones en {}", NOTIFY_CHANNEL);

    loop {
        let notification = listener.recv().await?;
        match serde_json::from_str::<RouteChange>(notification.payload()) {
            Ok(change) => feed.publish(change),
            Err(e) => warn!("⚠️ Payload de notificación inválido: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_filters_by_route() {
        let feed = ChangeFeed::default();
        let watched = Uuid::new_v4();
        let mut subscription = feed.subscribe_route(watched);

        feed.publish(RouteChange::now(Uuid::new_v4(), ChangedTable::BusLocations));
        feed.publish(RouteChange::now(watched, ChangedTable::StudentCounts));

        let change = subscription.next_change().await.unwrap();
        assert_eq!(change.route_id, watched);
        assert_eq!(change.table, ChangedTable::StudentCounts);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_still_gets_a_refresh() {
        let feed = ChangeFeed::new(2);
        let watched = Uuid::new_v4();
        let mut subscription = feed.subscribe_route(watched);

        for _ in 0..5 {
            feed.publish(RouteChange::now(watched, ChangedTable::BusLocations));
        }

        let change = subscription.next_change().await.unwrap();
        assert_eq!(change.route_id, watched);
    }

    #[test]
    fn test_trigger_payload_parses() {
        let payload = r#"{"route_id":"7f1c2d3e-0000-4000-8000-000000000001","table":"bus_locations","at":"2025-07-01T06:30:00.123456+00:00"}"#;
        let change: RouteChange = serde_json::from_str(payload).unwrap();
        assert_eq!(change.table, ChangedTable::BusLocations);
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let feed = ChangeFeed::default();
        feed.publish(RouteChange::now(Uuid::new_v4(), ChangedTable::Routes));
        assert_eq!(feed.subscriber_count(), 0);
    }
}
