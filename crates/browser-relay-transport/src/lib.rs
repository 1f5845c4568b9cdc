//! HTTP and WebSocket surfaces for the browser relay.
//!
//! Provides:
//! - Client-facing API router (sessions, tool calls, event stream, cancel)
//! - Executor-facing WebSocket endpoint

pub mod http;
pub mod websocket;

pub use http::api_router;
pub use websocket::executor_router;

use std::{sync::Arc, time::Duration};

use browser_relay_core::{CancellationController, RequestCorrelator};
use browser_relay_executor::ExecutorLink;
use browser_relay_session::{SessionRegistry, ToolDispatcher, storage::MemorySessionStore};

/// Shared state wired through both routers.
///
/// The whole service graph is owned here explicitly - no ambient module
/// state - so tests can build as many isolated instances as they like.
#[derive(Clone)]
pub struct RelayState {
    pub registry: Arc<SessionRegistry<MemorySessionStore>>,
    pub dispatcher: Arc<ToolDispatcher<MemorySessionStore>>,
    pub cancel: Arc<CancellationController>,
    pub link: Arc<ExecutorLink>,
}

impl RelayState {
    /// Build a fully wired relay with the given per-call reply deadline.
    #[must_use]
    pub fn new(request_timeout: Duration) -> Self {
        let correlator = RequestCorrelator::new();
        let registry = Arc::new(SessionRegistry::new(MemorySessionStore::new()));
        let link = Arc::new(ExecutorLink::new(Arc::clone(&correlator)));
        let dispatcher = Arc::new(
            ToolDispatcher::new(
                Arc::clone(&registry),
                Arc::clone(&link),
                Arc::clone(&correlator),
            )
            .with_timeout(request_timeout),
        );
        let cancel = Arc::new(CancellationController::new(correlator));

        Self {
            registry,
            dispatcher,
            cancel,
            link,
        }
    }
}
