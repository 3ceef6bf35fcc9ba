//! Translate handler: render the extraction to Markdown and translate it.

use async_trait::async_trait;

use super::{HandlerOutput, TaskHandler};
use crate::deps::Deps;
use crate::error::TaskError;
use crate::format;
use crate::llm::Completion;
use crate::records::ExtractionStore;
use crate::tasks::{Task, TaskParams};

const DEFAULT_TARGET_LANG: &str = "English";

pub struct TranslateHandler;

fn translation_prompt(target_lang: &str, markdown: &str) -> String {
    format!(
        "Translate the following Markdown document into {target_lang}.\n\
         Rules:\n\
         - Preserve all Markdown syntax exactly: links [text](url), images ![alt](url), \
         list items, horizontal rules, and hard line-breaks.\n\
         - Translate only the human-readable text; never translate URLs, @mentions, or #hashtags.\n\
         - Output the translated Markdown only, with no commentary.\n\n\
         {markdown}"
    )
}

#[async_trait]
impl TaskHandler for TranslateHandler {
    async fn execute(&self, task: &Task, deps: &Deps) -> Result<HandlerOutput, TaskError> {
        let TaskParams::Translate(params) = task.params()? else {
            return Err(TaskError::Validation(
                "translate handler received non-translate params".into(),
            ));
        };

        let record = deps
            .extractions
            .get(params.extraction_id)
            .await?
            .ok_or_else(|| {
                TaskError::DataIntegrity(format!("extraction {} not found", params.extraction_id))
            })?;

        let markdown = format::thread_to_markdown(record.tweets());
        let target_lang = params.target_lang.as_deref().unwrap_or(DEFAULT_TARGET_LANG);

        let translated = deps
            .ai
            .complete_with_model(
                &translation_prompt(target_lang, &markdown),
                params.model.as_deref(),
            )
            .await
            .map_err(|e| TaskError::External(e.to_string()))?;

        Ok(HandlerOutput::Payload(serde_json::json!({
            "extraction_id": params.extraction_id,
            "target_lang": target_lang,
            "markdown": translated,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ExtractionStore, NewExtraction};
    use crate::scrape::Tweet;
    use crate::tasks::{NewTask, TaskType};
    use crate::testing::{MockAi, ScriptedBrowser, TestDeps};
    use uuid::Uuid;

    fn sample_tweet() -> Tweet {
        Tweet {
            status_url: "/ada/status/1".into(),
            author_name: "Ada".into(),
            author_handle: "@ada".into(),
            text_html: r#"see <a href="https://e.com">the post</a>"#.into(),
            media: vec![],
            card: None,
        }
    }

    fn translate_task(extraction_id: Uuid) -> Task {
        NewTask::new(
            TaskType::Translate,
            serde_json::json!({"extraction_id": extraction_id, "target_lang": "German"}),
        )
        .into_task()
        .unwrap()
    }

    #[tokio::test]
    async fn returns_translated_markdown_without_touching_the_record() {
        let harness = TestDeps::new(
            ScriptedBrowser::new(Vec::<String>::new()),
            MockAi::with_response("sieh [the post](https://e.com)"),
        );
        let deps = harness.deps();
        let id = harness
            .extractions
            .insert(NewExtraction::from_thread("https://x.com/a", vec![sample_tweet()]))
            .await
            .unwrap();

        let output = TranslateHandler
            .execute(&translate_task(id), &deps)
            .await
            .unwrap();
        let HandlerOutput::Payload(payload) = output else {
            panic!("expected payload output");
        };
        assert_eq!(payload["target_lang"], "German");
        assert_eq!(payload["markdown"], "sieh [the post](https://e.com)");

        // prompt carried the rendered Markdown, not raw HTML
        let prompts = harness.ai.recorded_prompts();
        assert!(prompts[0].contains("[the post](https://e.com)"));
        assert!(!prompts[0].contains("<a href"));

        // source record unchanged
        let record = harness.extractions.get(id).await.unwrap().unwrap();
        assert_eq!(record.tweets()[0], sample_tweet());
    }

    #[tokio::test]
    async fn missing_extraction_is_a_data_integrity_failure() {
        let harness = TestDeps::new(ScriptedBrowser::new(Vec::<String>::new()), MockAi::new());
        let deps = harness.deps();

        let err = TranslateHandler
            .execute(&translate_task(Uuid::new_v4()), &deps)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::DataIntegrity(_)));
    }

    #[tokio::test]
    async fn llm_failure_surfaces_as_external() {
        let harness = TestDeps::new(ScriptedBrowser::new(Vec::<String>::new()), MockAi::new());
        let deps = harness.deps();
        let id = harness
            .extractions
            .insert(NewExtraction::from_thread("https://x.com/a", vec![sample_tweet()]))
            .await
            .unwrap();

        let err = TranslateHandler
            .execute(&translate_task(id), &deps)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::External(_)));
    }
}
