//! Session orchestration and storage for the browser relay.
//!
//! Provides:
//! - `SessionRegistry` - create, resolve and tear down client sessions
//! - `ToolDispatcher` - session-validated tool calls over the executor link
//! - Storage implementations (memory)

pub mod dispatch;
pub mod registry;
pub mod storage;

pub use dispatch::{FailureKind, ToolDispatcher, ToolResponse};
pub use registry::{RegistryError, SessionRegistry};
