//! Text-completion seam.
//!
//! Handlers call LLMs through the [`Completion`] trait so tests can swap in
//! a scripted double. Model responses are untrusted prose: when a handler
//! needs JSON it carves out the first balanced object with
//! [`first_json_object`] instead of parsing the reply wholesale.

use anyhow::Result;
use async_trait::async_trait;
use llm_client::{ChatRequest, LlmClient, Message};

/// Model used when a task does not pin one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Single request/response text completion keyed by a model hint.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Complete a prompt with the default model.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Complete a prompt with a specific model.
    async fn complete_with_model(&self, prompt: &str, model: Option<&str>) -> Result<String> {
        let _ = model;
        self.complete(prompt).await
    }
}

#[async_trait]
impl Completion for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        Completion::complete_with_model(self, prompt, None).await
    }

    async fn complete_with_model(&self, prompt: &str, model: Option<&str>) -> Result<String> {
        let model = model.unwrap_or(DEFAULT_MODEL);
        let request = ChatRequest::new(model).message(Message::user(prompt));

        let response = self
            .chat_completion(request)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        Ok(response.content)
    }
}

/// Locate the first balanced `{...}` block in a model response.
///
/// Models wrap JSON in explanatory text; this scans from the first opening
/// brace, tracking string literals and escapes, until the object closes.
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_object_is_returned_whole() {
        assert_eq!(first_json_object(r#"{"a": 1}"#), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn object_is_carved_out_of_surrounding_prose() {
        let response = r#"Sure! Here are the tags: {"tags": ["tech"]} — hope that helps."#;
        assert_eq!(first_json_object(response), Some(r#"{"tags": ["tech"]}"#));
    }

    #[test]
    fn nested_objects_balance() {
        let response = r#"{"reasons": {"tech": "it is"}} trailing"#;
        assert_eq!(
            first_json_object(response),
            Some(r#"{"reasons": {"tech": "it is"}}"#)
        );
    }

    #[test]
    fn braces_inside_strings_do_not_count() {
        let response = r#"{"note": "smile } {"} extra"#;
        assert_eq!(first_json_object(response), Some(r#"{"note": "smile } {"}"#));
    }

    #[test]
    fn escaped_quotes_do_not_end_the_string() {
        let response = r#"{"note": "a \"quoted\" }brace"}"#;
        assert_eq!(first_json_object(response), Some(response));
    }

    #[test]
    fn unbalanced_input_yields_none() {
        assert_eq!(first_json_object(r#"{"a": 1"#), None);
        assert_eq!(first_json_object("no json at all"), None);
    }
}
