//! Bulk cancellation of in-flight executor calls.

use std::sync::Arc;

use crate::{correlator::RequestCorrelator, error::RelayError};

/// Reason attached to calls rejected by a user-requested cancellation.
pub const CANCELLED_BY_USER: &str = "Operation cancelled by user request";

/// Forces rejection of every currently pending call on an external
/// cancel signal.
///
/// Cancellation is process-wide rather than scoped to the requesting
/// session: every pending entry is rejected and the session id is only
/// recorded in logs. It stops the relay from waiting; an action already
/// running inside the executor is not aborted.
pub struct CancellationController {
    correlator: Arc<RequestCorrelator>,
}

impl CancellationController {
    /// Create a controller over the given pending table.
    #[must_use]
    pub fn new(correlator: Arc<RequestCorrelator>) -> Self {
        Self { correlator }
    }

    /// Reject all pending calls, returning how many were cancelled.
    ///
    /// Zero cancellations is a normal outcome, not an error.
    pub fn cancel(&self, session_id: &str) -> usize {
        let reason = RelayError::Cancelled {
            reason: CANCELLED_BY_USER.to_owned(),
        };
        let cancelled = self.correlator.cancel_all(&reason);
        if cancelled > 0 {
            tracing::info!(session_id, cancelled, "cancelled pending executor calls");
        } else {
            tracing::debug!(session_id, "no pending executor calls to cancel");
        }
        cancelled
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn cancel_rejects_all_pending_with_the_user_reason() {
        let correlator = RequestCorrelator::new();
        let rx_1 = correlator.register(RequestCorrelator::next_id(), Duration::from_secs(30));
        let rx_2 = correlator.register(RequestCorrelator::next_id(), Duration::from_secs(30));

        let controller = CancellationController::new(Arc::clone(&correlator));
        assert_eq!(controller.cancel("session-1"), 2);

        for rx in [rx_1, rx_2] {
            let completion = rx.await.unwrap();
            assert_eq!(
                completion,
                Err(RelayError::Cancelled {
                    reason: CANCELLED_BY_USER.to_owned()
                })
            );
        }
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test]
    async fn cancel_with_nothing_pending_returns_zero() {
        let correlator = RequestCorrelator::new();
        let controller = CancellationController::new(Arc::clone(&correlator));
        assert_eq!(controller.cancel("session-1"), 0);
    }
}
