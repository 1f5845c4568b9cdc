//! Core building blocks for the browser relay.
//!
//! This crate provides the fundamental pieces:
//! - `RequestCorrelator` - id-keyed pending table with per-call timeouts
//! - `CancellationController` - process-wide bulk cancellation
//! - `EventStore` - broadcast + history event stream per session
//! - Session data model and the `SessionStore` trait

pub mod cancel;
pub mod correlator;
pub mod error;
pub mod events;
pub mod traits;

pub use cancel::CancellationController;
pub use correlator::{Completion, DEFAULT_REQUEST_TIMEOUT, RequestCorrelator, RequestId};
pub use error::RelayError;
pub use events::{EventStore, SessionEvent};
pub use traits::{Session, SessionId, SessionState, SessionStore, StoreError};
