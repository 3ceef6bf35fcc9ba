//! Tag handler: classify the extraction against a closed vocabulary.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{HandlerOutput, TaskHandler};
use crate::deps::Deps;
use crate::error::TaskError;
use crate::format;
use crate::llm::{first_json_object, Completion};
use crate::records::ExtractionStore;
use crate::tasks::{Task, TaskParams};

/// Byte cap on the content sent to the model.
const MAX_CONTENT_BYTES: usize = 8_000;

/// Required response contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagResponse {
    pub tags: Vec<String>,
    pub reasons: BTreeMap<String, String>,
}

pub struct TagHandler;

fn tag_prompt(vocabulary: &[String], markdown: &str) -> String {
    format!(
        "Classify the following content. Choose tags ONLY from this closed list:\n{}\n\n\
         Respond with strict JSON of the shape \
         {{\"tags\": [\"...\"], \"reasons\": {{\"tag\": \"why\"}}}} and nothing else. \
         Every tag must appear verbatim in the list above.\n\n\
         Content:\n{}",
        vocabulary.join(", "),
        markdown
    )
}

/// Parse and validate a model reply against the contract.
///
/// The reply is untrusted prose: the first balanced JSON object is carved
/// out, then the tag list is checked against the vocabulary. Anything off
/// contract fails the task — no silent substitution.
fn parse_tag_response(response: &str, vocabulary: &[String]) -> Result<TagResponse, TaskError> {
    let json = first_json_object(response).ok_or_else(|| {
        TaskError::MalformedResponse("no JSON object found in model response".into())
    })?;

    let parsed: TagResponse = serde_json::from_str(json)
        .map_err(|e| TaskError::MalformedResponse(format!("invalid tag JSON: {}", e)))?;

    if parsed.tags.is_empty() {
        return Err(TaskError::MalformedResponse(
            "model proposed no tags from the vocabulary".into(),
        ));
    }
    for tag in &parsed.tags {
        if !vocabulary.contains(tag) {
            return Err(TaskError::MalformedResponse(format!(
                "tag {:?} is not in the controlled vocabulary",
                tag
            )));
        }
    }

    Ok(parsed)
}

#[async_trait]
impl TaskHandler for TagHandler {
    async fn execute(&self, task: &Task, deps: &Deps) -> Result<HandlerOutput, TaskError> {
        let TaskParams::Tag(params) = task.params()? else {
            return Err(TaskError::Validation(
                "tag handler received non-tag params".into(),
            ));
        };
        if params.vocabulary.is_empty() {
            return Err(TaskError::Validation(
                "tag task requires a non-empty vocabulary".into(),
            ));
        }

        let record = deps
            .extractions
            .get(params.extraction_id)
            .await?
            .ok_or_else(|| {
                TaskError::DataIntegrity(format!("extraction {} not found", params.extraction_id))
            })?;

        let markdown = format::thread_to_markdown(record.tweets());
        let capped = format::truncate_content(&markdown, MAX_CONTENT_BYTES);

        let response = deps
            .ai
            .complete_with_model(
                &tag_prompt(&params.vocabulary, capped),
                params.model.as_deref(),
            )
            .await
            .map_err(|e| TaskError::External(e.to_string()))?;

        let parsed = parse_tag_response(&response, &params.vocabulary)?;

        let mut payload = serde_json::to_value(&parsed)
            .map_err(|e| TaskError::MalformedResponse(e.to_string()))?;
        payload["extraction_id"] = serde_json::json!(params.extraction_id);

        Ok(HandlerOutput::Payload(payload))
    }
}
