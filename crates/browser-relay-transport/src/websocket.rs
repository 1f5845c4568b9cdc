//! Executor-facing WebSocket endpoint.
//!
//! At most one executor is served at a time. A fresh connection takes
//! over by attaching to the [`crate::RelayState`] link, which bumps the
//! link generation and orphans the previous socket's registration. Each
//! socket task remembers the generation it was attached under and only
//! detaches itself if it still owns the link when its read loop ends.

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
    routing::get,
};
use browser_relay_core::SessionEvent;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::RelayState;

/// Build the executor-facing router.
#[must_use]
pub fn executor_router(state: RelayState) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<RelayState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: RelayState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    // Attaching replaces any previously connected executor.
    let generation = state.link.attach(tx);
    tracing::info!(generation, "executor connected");

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Some(status) = state.link.handle_message(&text) {
                    fan_out_status(&state, status).await;
                }
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!(generation, "ignoring binary frame from executor");
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(generation, error = %e, "executor socket error");
                break;
            }
        }
    }

    state.link.detach(generation);
    send_task.abort();
    tracing::info!(generation, "executor disconnected");
}

/// Mirror an executor status update into every live session's event
/// stream. Status updates carry no session id, so all clients see them.
async fn fan_out_status(state: &RelayState, payload: Value) {
    let sessions = match state.registry.list().await {
        Ok(sessions) => sessions,
        Err(e) => {
            tracing::error!(error = %e, "failed to list sessions for status fan-out");
            return;
        }
    };

    for session in sessions {
        session.events.push(SessionEvent::ExecutorStatus {
            payload: payload.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn status_updates_reach_every_session() {
        let state = RelayState::new(Duration::from_secs(30));
        let a = state.registry.create().await.unwrap();
        let b = state.registry.create().await.unwrap();

        fan_out_status(&state, json!({"status": "navigating"})).await;

        for session in [a, b] {
            let history = session.events.history();
            assert_eq!(history.len(), 1);
            assert!(matches!(history[0], SessionEvent::ExecutorStatus { .. }));
        }
    }
}
