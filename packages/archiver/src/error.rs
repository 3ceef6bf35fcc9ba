//! Typed errors for queue and handler operations.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match
//! on the failure class. Every variant is local to a single task: a failed
//! task never takes down the processor loop or its neighbors.

use thiserror::Error;

/// Errors raised by queue operations and task handlers.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Bad or missing enqueue parameters — rejected before a task row exists
    #[error("validation error: {0}")]
    Validation(String),

    /// An external call (page automation, LLM) failed; surfaces as a failed
    /// task with the captured message. Re-queueing is the caller's decision.
    #[error("external service error: {0}")]
    External(String),

    /// A handler referenced a record that does not exist
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    /// The model's output violated the required response contract
    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    /// Storage failure (connection, constraint, serialization)
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl TaskError {
    /// True when the failure means the enqueue input itself was rejected,
    /// i.e. no task row was ever created.
    pub fn is_validation(&self) -> bool {
        matches!(self, TaskError::Validation(_))
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(e: serde_json::Error) -> Self {
        TaskError::Validation(format!("invalid params payload: {}", e))
    }
}
