//! Domain model (messages, queue handles, worker state, decisions, errors).

pub mod decision;
pub mod errors;
pub mod message;
pub mod queue_handle;
pub mod state;

pub use self::decision::{BackoffDecision, DeletePolicy, FailureKind, StopReason};
pub use self::errors::{HandlerError, PollerError, QueueError};
pub use self::message::{Message, ReceiptHandle};
pub use self::queue_handle::QueueHandle;
pub use self::state::{WorkerMode, WorkerState};
