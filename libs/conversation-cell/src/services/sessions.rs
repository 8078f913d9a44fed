use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::Session;

/// In-process session registry. Each session sits behind its own mutex so
/// turns for one session are processed strictly one at a time.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_minutes: u64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout: Duration::minutes(idle_minutes as i64),
        }
    }

    pub async fn create(&self) -> Session {
        let session = Session::new();
        self.sessions
            .write()
            .await
            .insert(session.id, Arc::new(Mutex::new(session.clone())));
        debug!("Session {} created", session.id);
        session
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Removes sessions idle since before `now - idle_timeout` and hands them
    /// back. Sessions in the middle of a turn are left alone.
    pub async fn prune_idle(&self, now: DateTime<Utc>) -> Vec<Session> {
        let cutoff = now - self.idle_timeout;
        let mut sessions = self.sessions.write().await;
        let mut pruned = Vec::new();
        sessions.retain(|_, session| match session.try_lock() {
            Ok(session) if session.last_activity < cutoff => {
                pruned.push(session.clone());
                false
            }
            _ => true,
        });
        if !pruned.is_empty() {
            info!("Discarded {} idle session(s)", pruned.len());
        }
        pruned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prune_drops_only_idle_sessions() {
        let store = SessionStore::new(30);
        let stale = store.create().await;
        let fresh = store.create().await;

        if let Some(session) = store.get(stale.id).await {
            session.lock().await.last_activity = Utc::now() - Duration::minutes(45);
        }

        let pruned = store.prune_idle(Utc::now()).await;
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].id, stale.id);
        assert!(store.get(stale.id).await.is_none());
        assert!(store.get(fresh.id).await.is_some());
    }

    #[tokio::test]
    async fn test_busy_session_survives_prune() {
        let store = SessionStore::new(0);
        let session = store.create().await;
        let handle = store.get(session.id).await.unwrap();
        let _guard = handle.lock().await;

        assert!(store.prune_idle(Utc::now() + Duration::minutes(5)).await.is_empty());
        assert_eq!(store.len().await, 1);
    }
}
