//! In-memory session storage.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::{SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use browser_relay_core::{EventStore, Session, SessionState, SessionStore, StoreError};
use uuid::Uuid;

/// In-memory storage implementation.
///
/// The only backend: all session state is in-memory and lost on restart.
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self) -> Result<Session, StoreError> {
        let session = Session {
            id: Uuid::new_v4().to_string(),
            state: SessionState::Uninitialized,
            events: Arc::new(EventStore::new()),
            created_at: now(),
        };

        self.sessions
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?
            .insert(session.id.clone(), session.clone());

        Ok(session)
    }

    async fn get(&self, id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self
            .sessions
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?
            .get(id)
            .cloned())
    }

    async fn set_state(&self, id: &str, state: SessionState) -> Result<(), StoreError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;

        let session = sessions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_owned()))?;

        session.state = state;
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self
            .sessions
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?
            .remove(id))
    }

    async fn list(&self) -> Result<Vec<Session>, StoreError> {
        Ok(self
            .sessions
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?
            .values()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_starts_uninitialized() {
        let store = MemorySessionStore::new();
        let session = store.insert().await.unwrap();
        assert_eq!(session.state, SessionState::Uninitialized);
        assert!(store.get(&session.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn set_state_on_missing_session_errors() {
        let store = MemorySessionStore::new();
        let err = store
            .set_state("missing", SessionState::Active)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn remove_returns_the_record() {
        let store = MemorySessionStore::new();
        let session = store.insert().await.unwrap();
        let removed = store.remove(&session.id).await.unwrap().unwrap();
        assert_eq!(removed.id, session.id);
        assert!(store.remove(&session.id).await.unwrap().is_none());
    }
}
