//! Tool dispatch: forwards a session's tool calls to the executor and
//! shapes the result for the caller.

use std::{sync::Arc, time::Duration};

use browser_relay_core::{
    DEFAULT_REQUEST_TIMEOUT, RelayError, RequestCorrelator, SessionEvent, SessionStore,
};
use browser_relay_executor::{ActionRequest, ExecutorLink};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::SessionRegistry;

/// How an unsuccessful call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The executor ran the action and reported failure.
    Execution,
    /// The executor was unreachable or transmission failed.
    Transport,
    /// No reply arrived before the deadline.
    Timeout,
    /// The wait was abandoned by a bulk cancellation.
    Cancelled,
    /// The session is unknown or no longer active.
    Session,
}

/// Structured result returned for every tool call.
///
/// Failures are data, not exceptions: nothing escapes the dispatcher as
/// an `Err` or a panic, and the failure kind distinguishes an executor
/// rejection from a transport problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl ToolResponse {
    fn completed(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            failure: None,
        }
    }

    fn failed(kind: FailureKind, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            failure: Some(kind),
        }
    }
}

const fn failure_kind(err: &RelayError) -> FailureKind {
    match err {
        RelayError::ExecutorRejected(_) => FailureKind::Execution,
        RelayError::RequestTimeout { .. } => FailureKind::Timeout,
        RelayError::Cancelled { .. } => FailureKind::Cancelled,
        RelayError::SessionNotFound(_) => FailureKind::Session,
        RelayError::ConnectionUnavailable | RelayError::ProtocolValidation(_) => {
            FailureKind::Transport
        }
    }
}

/// Forwards tool calls through the correlator and the executor link.
pub struct ToolDispatcher<S>
where
    S: SessionStore,
{
    registry: Arc<SessionRegistry<S>>,
    link: Arc<ExecutorLink>,
    correlator: Arc<RequestCorrelator>,
    timeout: Duration,
}

impl<S> ToolDispatcher<S>
where
    S: SessionStore,
{
    /// Create a dispatcher with the default per-call timeout.
    #[must_use]
    pub fn new(
        registry: Arc<SessionRegistry<S>>,
        link: Arc<ExecutorLink>,
        correlator: Arc<RequestCorrelator>,
    ) -> Self {
        Self {
            registry,
            link,
            correlator,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Override the per-call reply deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Invoke `tool` for `session_id` and await the executor's reply.
    ///
    /// Always returns a [`ToolResponse`]; errors of every kind are folded
    /// into it. Concurrent invocations are independent: each one carries
    /// its own correlation id and replies may arrive in any order.
    pub async fn invoke(&self, session_id: &str, tool: &str, args: Value) -> ToolResponse {
        let session = match self.registry.get(session_id).await {
            Ok(Some(session)) if session.is_active() => session,
            Ok(_) => {
                return ToolResponse::failed(
                    FailureKind::Session,
                    RelayError::SessionNotFound(session_id.to_owned()).to_string(),
                );
            }
            Err(e) => return ToolResponse::failed(FailureKind::Session, e.to_string()),
        };

        // No executor: fail fast without registering an entry, so no
        // timer is ever created for a call that cannot be sent.
        if !self.link.is_connected() {
            let response = ToolResponse::failed(
                FailureKind::Transport,
                RelayError::ConnectionUnavailable.to_string(),
            );
            session.events.push(SessionEvent::ToolFailed {
                tool: tool.to_owned(),
                error: RelayError::ConnectionUnavailable.to_string(),
            });
            return response;
        }

        let id = RequestCorrelator::next_id();
        let receiver = self.correlator.register(id, self.timeout);
        let request = ActionRequest::new(id, tool, args);

        tracing::debug!(%id, tool, session_id = %session.id, "dispatching tool call");
        if let Err(e) = self.link.send(&request) {
            // Transmission failed: fail the entry now rather than letting
            // the caller wait out the timeout.
            self.correlator.fail(id, e);
        }

        let completion = receiver
            .await
            .unwrap_or(Err(RelayError::ConnectionUnavailable));

        let response = match completion {
            Ok(data) => ToolResponse::completed(data),
            Err(err) => {
                tracing::debug!(%id, tool, error = %err, "tool call failed");
                ToolResponse::failed(failure_kind(&err), err.to_string())
            }
        };

        let event = if response.success {
            SessionEvent::ToolCompleted {
                tool: tool.to_owned(),
                data: response.data.clone().unwrap_or(Value::Null),
            }
        } else {
            SessionEvent::ToolFailed {
                tool: tool.to_owned(),
                error: response.error.clone().unwrap_or_default(),
            }
        };
        session.events.push(event);

        response
    }
}
