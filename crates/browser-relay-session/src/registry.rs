//! Session registry: tracks logically distinct client conversations.

use browser_relay_core::{Session, SessionEvent, SessionState, SessionStore, StoreError};

/// Registry error.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Session not found: {0}")]
    NotFound(String),
}

/// Maps session identifiers to per-session state records.
///
/// Sessions are created on an initialization event from a client and
/// removed on explicit teardown. The registry exclusively owns the
/// session table; everything else resolves sessions through it.
pub struct SessionRegistry<S>
where
    S: SessionStore,
{
    store: S,
}

impl<S> SessionRegistry<S>
where
    S: SessionStore,
{
    /// Create a registry over the given storage backend.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Mint a fresh session and activate it.
    ///
    /// # Errors
    /// Returns error if the storage backend fails.
    pub async fn create(&self) -> Result<Session, RegistryError> {
        let session = self.store.insert().await?;
        self.store
            .set_state(&session.id, SessionState::Active)
            .await?;
        tracing::info!(session_id = %session.id, "session created");
        Ok(Session {
            state: SessionState::Active,
            ..session
        })
    }

    /// Look up a session by id.
    ///
    /// Externally supplied ids sometimes arrive with altered casing, so
    /// an exact miss falls back to a normalized (ASCII case-insensitive)
    /// comparison.
    ///
    /// # Errors
    /// Returns error if the storage backend fails.
    pub async fn get(&self, id: &str) -> Result<Option<Session>, RegistryError> {
        if let Some(session) = self.store.get(id).await? {
            return Ok(Some(session));
        }
        let sessions = self.store.list().await?;
        let matched = sessions
            .into_iter()
            .find(|session| session.id.eq_ignore_ascii_case(id));
        if let Some(ref session) = matched {
            tracing::debug!(supplied = id, resolved = %session.id, "session id matched after normalization");
        }
        Ok(matched)
    }

    /// Close a session and remove it from the registry.
    ///
    /// Calls already in flight for this session are not cancelled; they
    /// complete or time out against the correlator.
    ///
    /// # Errors
    /// Returns [`RegistryError::NotFound`] for unknown ids.
    pub async fn close(&self, id: &str) -> Result<(), RegistryError> {
        let session = self
            .get(id)
            .await?
            .ok_or_else(|| RegistryError::NotFound(id.to_owned()))?;

        self.store
            .set_state(&session.id, SessionState::Closed)
            .await?;
        if let Some(removed) = self.store.remove(&session.id).await? {
            removed.events.push(SessionEvent::Closed);
        }
        tracing::info!(session_id = %session.id, "session closed");
        Ok(())
    }

    /// Snapshot of all tracked sessions.
    ///
    /// # Errors
    /// Returns error if the storage backend fails.
    pub async fn list(&self) -> Result<Vec<Session>, RegistryError> {
        Ok(self.store.list().await?)
    }

    /// Number of sessions currently tracked.
    ///
    /// # Errors
    /// Returns error if the storage backend fails.
    pub async fn count(&self) -> Result<usize, RegistryError> {
        Ok(self.store.list().await?.len())
    }
}
