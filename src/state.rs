//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::config::environment::EnvironmentConfig;
use crate::models::Session;
use crate::repositories::ShuttleRepository;
use crate::services::change_feed::ChangeFeed;
use crate::utils::jwt::JwtConfig;

/// Sesiones activas indexadas por id de sesión
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    pub async fn insert(&self, session: Session) {
        self.sessions.write().await.insert(session.id, session);
    }

    /// Una sesión expirada cuenta como inexistente
    pub async fn get(&self, session_id: Uuid) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions.get(&session_id).filter(|session| !session.is_expired()).cloned()
    }

    pub async fn remove(&self, session_id: Uuid) -> Option<Session> {
        self.sessions.write().await.remove(&session_id)
    }

    /// Limpiar sesiones expiradas; devuelve cuántas se borraron
    pub async fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        before - sessions.len()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn ShuttleRepository>,
    pub config: EnvironmentConfig,
    pub jwt: JwtConfig,
    pub feed: ChangeFeed,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(repo: Arc<dyn ShuttleRepository>, config: EnvironmentConfig) -> Self {
        Self {
            repo,
            jwt: JwtConfig::from(&config),
            config,
            feed: ChangeFeed::default(),
            sessions: SessionStore::default(),
        }
    }

    /// Tarea de fondo que purga sesiones expiradas
    pub fn spawn_session_cleanup(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let sessions = self.sessions.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let removed = sessions.cleanup_expired().await;
                if removed > 0 {
                    debug!("🧹 {} sesiones expiradas eliminadas", removed);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use chrono::Utc;

    fn session(expires_in: i64) -> Session {
        Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role: UserRole::Student,
            name: "Asha".to_string(),
            email: "asha@campus.edu".to_string(),
            created_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in),
        }
    }

    #[tokio::test]
    async fn test_expired_sessions_are_invisible_and_purged() {
        let store = SessionStore::default();
        let live = session(3600);
        let dead = session(-10);
        store.insert(live.clone()).await;
        store.insert(dead.clone()).await;

        assert_eq!(store.get(live.id).await, Some(live.clone()));
        assert!(store.get(dead.id).await.is_none());
        assert_eq!(store.cleanup_expired().await, 1);
    }

    #[tokio::test]
    async fn test_removed_session_is_gone() {
        let store = SessionStore::default();
        let s = session(3600);
        store.insert(s.clone()).await;

        assert!(store.remove(s.id).await.is_some());
        assert!(store.get(s.id).await.is_none());
    }
}
