//! Execution pipeline failure modes.

use thiserror::Error;

/// A failed pipeline operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// The pipeline is not running; the item was not queued.
    #[error("execution pipeline is not running")]
    NotRunning,

    /// The outbound queue is at capacity.
    #[error("outbound queue is full")]
    QueueFull,

    /// The outbound queue was closed (workers gone).
    #[error("outbound queue is closed")]
    QueueClosed,
}
