//! Error taxonomy for relayed calls.

use std::time::Duration;

use thiserror::Error;

/// Failure modes surfaced to individual in-flight calls.
///
/// None of these are process-fatal: the relay stays available and fails
/// single calls when the executor is absent or unresponsive. The enum is
/// `Clone` so a bulk cancellation can fan one reason out to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// No executor is attached to the relay.
    #[error("WebSocket connection to executor is not available")]
    ConnectionUnavailable,

    /// No reply arrived within the per-call deadline.
    #[error("Request timed out after {} seconds", after.as_secs())]
    RequestTimeout { after: Duration },

    /// The executor replied with `success: false`.
    #[error("Executor rejected action: {0}")]
    ExecutorRejected(String),

    /// Unknown or closed session id.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Malformed inbound frame. Logged and dropped at the link; never
    /// delivered to a waiting caller.
    #[error("Protocol validation failed: {0}")]
    ProtocolValidation(String),

    /// The call was rejected by a bulk cancellation.
    #[error("{reason}")]
    Cancelled { reason: String },
}

impl RelayError {
    /// Whether this failure came from the executor's own reply rather
    /// than the transport or the relay's bookkeeping.
    #[must_use]
    pub const fn is_execution_failure(&self) -> bool {
        matches!(self, Self::ExecutorRejected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_seconds() {
        let err = RelayError::RequestTimeout {
            after: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "Request timed out after 30 seconds");
    }

    #[test]
    fn cancelled_message_is_the_reason() {
        let err = RelayError::Cancelled {
            reason: "Operation cancelled by user request".to_owned(),
        };
        assert_eq!(err.to_string(), "Operation cancelled by user request");
    }
}
