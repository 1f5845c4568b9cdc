//! The single outbound channel to the remote executor.

use std::sync::{Arc, Mutex};

use browser_relay_core::{RelayError, RequestCorrelator};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::protocol::{ActionRequest, ExecutorMessage, RelayNotice};

/// Monotonic tag naming one attached connection.
///
/// A disconnect only clears the link if its generation still matches,
/// so a straggling close from an already-replaced socket is a no-op.
pub type Generation = u64;

struct Connection {
    outbound: mpsc::UnboundedSender<String>,
    generation: Generation,
}

struct State {
    conn: Option<Connection>,
    next_generation: Generation,
}

/// Owner of the single live executor connection.
///
/// At most one connection is live at any time; a newly attached executor
/// forcibly replaces the previous one. Outbound envelopes are queued on
/// the connection's writer channel; inbound replies are routed to the
/// correlator by id.
pub struct ExecutorLink {
    correlator: Arc<RequestCorrelator>,
    state: Mutex<State>,
}

impl ExecutorLink {
    /// Create a link that routes replies into `correlator`.
    #[must_use]
    pub fn new(correlator: Arc<RequestCorrelator>) -> Self {
        Self {
            correlator,
            state: Mutex::new(State {
                conn: None,
                next_generation: 0,
            }),
        }
    }

    /// Whether an executor connection is currently live.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state
            .lock()
            .unwrap()
            .conn
            .as_ref()
            .is_some_and(|conn| !conn.outbound.is_closed())
    }

    /// Attach a new executor connection, replacing any live one.
    ///
    /// The previous connection's writer channel is dropped, which closes
    /// its socket without draining. Calls still pending against the
    /// replaced connection are failed eagerly with
    /// [`RelayError::ConnectionUnavailable`]: the executor that could
    /// have answered them is gone.
    ///
    /// Queues the `server_connected` greeting on the new connection and
    /// returns its generation.
    pub fn attach(&self, outbound: mpsc::UnboundedSender<String>) -> Generation {
        let generation = {
            let mut state = self.state.lock().unwrap();
            if state.conn.is_some() {
                tracing::warn!("executor reconnected; replacing the live connection");
            }
            state.next_generation += 1;
            let generation = state.next_generation;
            state.conn = Some(Connection {
                outbound: outbound.clone(),
                generation,
            });
            generation
        };

        let stale = self.correlator.cancel_all(&RelayError::ConnectionUnavailable);
        if stale > 0 {
            tracing::warn!(stale, "failed pending calls from before the reconnect");
        }

        if let Ok(frame) = serde_json::to_string(&RelayNotice::server_connected()) {
            let _ = outbound.send(frame);
        }
        tracing::info!(generation, "executor connected");
        generation
    }

    /// Drop the live connection if `generation` still names it.
    ///
    /// Pending entries are left to their own timeouts; disconnection by
    /// itself does not rewrite the pending table.
    pub fn detach(&self, generation: Generation) {
        let mut state = self.state.lock().unwrap();
        if state
            .conn
            .as_ref()
            .is_some_and(|conn| conn.generation == generation)
        {
            state.conn = None;
            tracing::info!(generation, "executor disconnected");
        }
    }

    /// Send a call envelope to the executor.
    ///
    /// # Errors
    /// [`RelayError::ConnectionUnavailable`] if no connection is live or
    /// the writer has gone away; the caller must then fail its pending
    /// entry immediately instead of waiting for the timeout.
    pub fn send(&self, request: &ActionRequest) -> Result<(), RelayError> {
        let frame = serde_json::to_string(request)
            .map_err(|e| RelayError::ProtocolValidation(e.to_string()))?;

        let mut state = self.state.lock().unwrap();
        let conn = state
            .conn
            .as_ref()
            .ok_or(RelayError::ConnectionUnavailable)?;
        if conn.outbound.send(frame).is_err() {
            // Writer task is gone; the connection is dead.
            state.conn = None;
            return Err(RelayError::ConnectionUnavailable);
        }
        tracing::debug!(id = %request.id, action = %request.action, "envelope queued for executor");
        Ok(())
    }

    /// Route one inbound frame from the executor.
    ///
    /// `action_response` frames complete the matching pending entry.
    /// Malformed frames (unparseable, missing correlation id) are logged
    /// and dropped, never surfaced to a waiting caller. Returns the
    /// payload of a `status_update` so the transport can fan it out to
    /// session streams.
    pub fn handle_message(&self, raw: &str) -> Option<Value> {
        match serde_json::from_str::<ExecutorMessage>(raw) {
            Ok(ExecutorMessage::ActionResponse { payload }) => {
                self.correlator.complete(
                    payload.request_id,
                    payload.success,
                    payload.data,
                    payload.error,
                );
                None
            }
            Ok(ExecutorMessage::StatusUpdate { payload }) => {
                tracing::debug!(?payload, "executor status update");
                Some(payload)
            }
            Ok(ExecutorMessage::Unknown) => {
                tracing::debug!(raw, "ignoring unrecognized executor message");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, raw, "dropping malformed executor frame");
                None
            }
        }
    }
}
