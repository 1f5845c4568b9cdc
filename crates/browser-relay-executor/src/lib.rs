//! Executor bridge for the browser relay.
//!
//! Provides:
//! - Wire protocol types exchanged with the executor
//! - `ExecutorLink` - owner of the single live executor connection

pub mod link;
pub mod protocol;

pub use link::{ExecutorLink, Generation};
pub use protocol::{ActionRequest, ActionResponsePayload, ExecutorMessage, RelayNotice};
