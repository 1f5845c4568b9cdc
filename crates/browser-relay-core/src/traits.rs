//! Session data model and the storage seam.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::EventStore;

/// Externally visible session identifier.
///
/// Kept as an opaque string rather than a parsed UUID: clients echo the
/// id back through headers and query parameters, where casing is not
/// always preserved, and lookup tolerates that.
pub type SessionId = String;

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created but not yet serving calls.
    Uninitialized,
    /// Accepting tool calls.
    Active,
    /// Torn down; about to be removed from the registry.
    Closed,
}

/// A logical client conversation tracked by the relay.
///
/// Session identity is the only key other state is keyed by; nothing
/// belonging to a session outlives its registry entry.
#[derive(Clone)]
pub struct Session {
    /// Unique session identifier.
    pub id: SessionId,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Transport handle: the event stream delivered to this session's client.
    pub events: Arc<EventStore>,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: i64,
}

impl Session {
    /// Whether the session currently accepts tool calls.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }
}

/// Storage error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),
    #[error("Storage error: {0}")]
    Internal(String),
}

/// Trait for session storage backends.
///
/// All current backends are in-memory; no session state survives a
/// process restart.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a fresh session record in the `Uninitialized` state.
    async fn insert(&self) -> Result<Session, StoreError>;

    /// Get a session by exact id.
    async fn get(&self, id: &str) -> Result<Option<Session>, StoreError>;

    /// Update a session's lifecycle state.
    async fn set_state(&self, id: &str, state: SessionState) -> Result<(), StoreError>;

    /// Remove a session record, returning it if present.
    async fn remove(&self, id: &str) -> Result<Option<Session>, StoreError>;

    /// Snapshot all sessions.
    async fn list(&self) -> Result<Vec<Session>, StoreError>;
}
