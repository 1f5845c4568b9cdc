//! Per-session event stream with bounded history.

use std::{collections::VecDeque, sync::RwLock};

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Most recent events retained for late subscribers.
const HISTORY_EVENTS: usize = 256;

/// Observable session happenings pushed to streaming clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A tool call finished and the executor returned data.
    ToolCompleted { tool: String, data: Value },
    /// A tool call failed (execution, transport or timeout).
    ToolFailed { tool: String, error: String },
    /// A bulk cancellation rejected pending calls.
    Cancelled { count: usize },
    /// Informational status pushed by the executor.
    ExecutorStatus { payload: Value },
    /// The session was closed.
    Closed,
}

impl SessionEvent {
    /// Render as an SSE event (requires the `sse` feature).
    #[cfg(feature = "sse")]
    #[must_use]
    pub fn to_sse_event(&self) -> axum::response::sse::Event {
        let data = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_owned());
        axum::response::sse::Event::default().data(data)
    }
}

struct Inner {
    history: VecDeque<SessionEvent>,
}

/// Broadcast + history store backing a session's transport handle.
///
/// New subscribers receive the retained history and then seamlessly
/// switch to live events, so a client reconnecting mid-session does not
/// miss results that completed while it was away.
pub struct EventStore {
    inner: RwLock<Inner>,
    sender: broadcast::Sender<SessionEvent>,
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore {
    /// Create an empty event store.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1024);
        Self {
            inner: RwLock::new(Inner {
                history: VecDeque::with_capacity(32),
            }),
            sender,
        }
    }

    /// Push an event to live subscribers and into history.
    pub fn push(&self, event: SessionEvent) {
        let _ = self.sender.send(event.clone()); // live listeners
        let mut inner = self.inner.write().unwrap();
        if inner.history.len() == HISTORY_EVENTS {
            inner.history.pop_front();
        }
        inner.history.push_back(event);
    }

    /// Get a receiver for live events only.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Snapshot of the retained history.
    #[must_use]
    pub fn history(&self) -> Vec<SessionEvent> {
        self.inner.read().unwrap().history.iter().cloned().collect()
    }

    /// Stream that yields history first, then live events.
    #[must_use]
    pub fn history_plus_stream(&self) -> futures::stream::BoxStream<'static, SessionEvent> {
        let (history, rx) = (self.history(), self.subscribe());

        let hist = futures::stream::iter(history);
        let live = BroadcastStream::new(rx).filter_map(|res| async move { res.ok() });

        Box::pin(hist.chain(live))
    }

    /// SSE stream of history then live events (requires the `sse` feature).
    #[cfg(feature = "sse")]
    #[must_use]
    pub fn sse_stream(
        &self,
    ) -> futures::stream::BoxStream<
        'static,
        Result<axum::response::sse::Event, std::convert::Infallible>,
    > {
        self.history_plus_stream()
            .map(|event| Ok(event.to_sse_event()))
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_get_history_then_live_events() {
        let store = EventStore::new();
        store.push(SessionEvent::ExecutorStatus {
            payload: serde_json::json!({"status": "connected"}),
        });

        let mut stream = store.history_plus_stream();
        let first = stream.next().await.unwrap();
        assert!(matches!(first, SessionEvent::ExecutorStatus { .. }));

        store.push(SessionEvent::Closed);
        let second = stream.next().await.unwrap();
        assert!(matches!(second, SessionEvent::Closed));
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let store = EventStore::new();
        for count in 0..(HISTORY_EVENTS + 10) {
            store.push(SessionEvent::Cancelled { count });
        }

        let history = store.history();
        assert_eq!(history.len(), HISTORY_EVENTS);
        // Oldest entries were evicted first.
        assert!(matches!(history[0], SessionEvent::Cancelled { count: 10 }));
    }

    #[test]
    fn events_serialize_with_snake_case_tags() {
        let json = serde_json::to_string(&SessionEvent::ToolFailed {
            tool: "click".to_owned(),
            error: "no executor".to_owned(),
        })
        .unwrap();
        assert!(json.contains("\"type\":\"tool_failed\""));
    }
}
