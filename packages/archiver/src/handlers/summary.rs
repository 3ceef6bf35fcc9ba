//! Summary handler.
//!
//! TODO: real summarization lands with the digest feature; until then every
//! summary task completes with a placeholder payload.

use async_trait::async_trait;

use super::{HandlerOutput, TaskHandler};
use crate::deps::Deps;
use crate::error::TaskError;
use crate::tasks::Task;

pub struct SummaryHandler;

#[async_trait]
impl TaskHandler for SummaryHandler {
    async fn execute(&self, _task: &Task, _deps: &Deps) -> Result<HandlerOutput, TaskError> {
        Ok(HandlerOutput::Payload(serde_json::json!({
            "summary": "Summary generation is not available yet."
        })))
    }
}
