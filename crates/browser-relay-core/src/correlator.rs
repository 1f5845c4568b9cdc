//! Request/response correlation for executor calls.
//!
//! Arbitrarily many calls are multiplexed over the single executor
//! connection; each carries a correlation id that the executor echoes
//! back in its reply. The correlator owns the pending table and matches
//! asynchronous replies to the calls that requested them.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use serde_json::{Value, json};
use tokio::{sync::oneshot, task::JoinHandle, time::Instant};
use uuid::Uuid;

use crate::error::RelayError;

/// Correlation id attached to a call and echoed back in its reply.
pub type RequestId = Uuid;

/// Deadline for an executor reply when the caller does not override it.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The single completion delivered for a call: the executor's data
/// payload, or the error that ended the wait.
pub type Completion = Result<Value, RelayError>;

/// Bookkeeping for one in-flight call.
struct PendingRequest {
    created_at: Instant,
    tx: oneshot::Sender<Completion>,
    timer: JoinHandle<()>,
}

/// Maps correlation ids to pending completion handles.
///
/// The correlator exclusively owns the pending table. Every entry is
/// completed exactly once - reply, timeout, transmission failure or bulk
/// cancellation, whichever fires first - because delivering a completion
/// removes the entry. Replies may arrive in any order relative to
/// submission; entries are independently keyed.
pub struct RequestCorrelator {
    pending: Mutex<HashMap<RequestId, PendingRequest>>,
}

impl RequestCorrelator {
    /// Create a correlator with an empty pending table.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(HashMap::new()),
        })
    }

    /// Mint a fresh correlation id.
    #[must_use]
    pub fn next_id() -> RequestId {
        Uuid::new_v4()
    }

    /// Register a pending entry and arm its timeout.
    ///
    /// The returned receiver yields exactly one [`Completion`]. If no
    /// completion arrives within `timeout`, the entry auto-rejects with
    /// [`RelayError::RequestTimeout`] and leaves the table.
    pub fn register(
        self: &Arc<Self>,
        id: RequestId,
        timeout: Duration,
    ) -> oneshot::Receiver<Completion> {
        let (tx, rx) = oneshot::channel();

        let correlator = Arc::clone(self);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            correlator.expire(id, timeout);
        });

        let entry = PendingRequest {
            created_at: Instant::now(),
            tx,
            timer,
        };
        if let Some(stale) = self.pending.lock().unwrap().insert(id, entry) {
            // A v4 collision among pending entries is practically
            // unreachable, but never leave an orphaned timer running.
            stale.timer.abort();
        }
        rx
    }

    /// Complete a pending entry with the executor's reply.
    ///
    /// A successful reply without data resolves to `{"success": true}`.
    /// Unknown or already-completed ids are logged and dropped; a late or
    /// duplicate reply is not an error and is never double-delivered.
    pub fn complete(&self, id: RequestId, success: bool, data: Option<Value>, error: Option<String>) {
        let Some(entry) = self.remove(id) else {
            tracing::debug!(%id, "dropping reply for unknown or already-completed request");
            return;
        };
        entry.timer.abort();

        let completion = if success {
            Ok(data.unwrap_or_else(|| json!({ "success": true })))
        } else {
            Err(RelayError::ExecutorRejected(
                error.unwrap_or_else(|| "Executor action failed".to_owned()),
            ))
        };
        tracing::debug!(%id, elapsed = ?entry.created_at.elapsed(), success, "request completed");
        // The caller may have gone away; nothing to do then.
        let _ = entry.tx.send(completion);
    }

    /// Reject a single pending entry immediately.
    ///
    /// Used when transmission itself fails, so the caller is not left
    /// waiting for the timeout and no dangling timer survives.
    pub fn fail(&self, id: RequestId, err: RelayError) {
        if let Some(entry) = self.remove(id) {
            entry.timer.abort();
            let _ = entry.tx.send(Err(err));
        }
    }

    /// Reject every pending entry with `reason` and clear the table.
    ///
    /// Returns the number of entries rejected.
    pub fn cancel_all(&self, reason: &RelayError) -> usize {
        let drained: Vec<(RequestId, PendingRequest)> =
            self.pending.lock().unwrap().drain().collect();
        let count = drained.len();
        for (id, entry) in drained {
            tracing::debug!(%id, %reason, "rejecting pending request");
            entry.timer.abort();
            let _ = entry.tx.send(Err(reason.clone()));
        }
        count
    }

    /// Number of calls currently awaiting a reply.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    fn expire(&self, id: RequestId, after: Duration) {
        if let Some(entry) = self.remove(id) {
            tracing::warn!(%id, waited = ?entry.created_at.elapsed(), "no executor reply before deadline");
            let _ = entry.tx.send(Err(RelayError::RequestTimeout { after }));
        }
    }

    fn remove(&self, id: RequestId) -> Option<PendingRequest> {
        self.pending.lock().unwrap().remove(&id)
    }
}
