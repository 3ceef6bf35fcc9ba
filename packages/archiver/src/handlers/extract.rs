//! Extract handler: scrape a thread and persist the extraction record.

use async_trait::async_trait;
use tracing::info;
use url::Url;

use super::{HandlerOutput, TaskHandler};
use crate::deps::Deps;
use crate::error::TaskError;
use crate::records::{ExtractionStore, NewExtraction};
use crate::scrape::{ScrollEngine, ThreadCollector};
use crate::tasks::{Task, TaskParams};

pub struct ExtractHandler;

#[async_trait]
impl TaskHandler for ExtractHandler {
    async fn execute(&self, task: &Task, deps: &Deps) -> Result<HandlerOutput, TaskError> {
        let TaskParams::Extract(params) = task.params()? else {
            return Err(TaskError::Validation(
                "extract handler received non-extract params".into(),
            ));
        };

        Url::parse(&params.url)
            .map_err(|e| TaskError::Validation(format!("invalid url {:?}: {}", params.url, e)))?;

        let mut config = deps.scroll.clone();
        if let Some(max_steps) = params.max_steps {
            config.max_steps = max_steps;
        }
        if let Some(max_items) = params.max_items {
            config.max_items = Some(max_items);
        }

        let session = ScrollEngine::new(config)
            .run(deps.browser.as_ref(), &params.url, &ThreadCollector)
            .await
            .map_err(|e| TaskError::External(e.to_string()))?;

        // An empty session never produces a record.
        if session.item_count == 0 {
            return Err(TaskError::External(format!(
                "no tweets collected from {}",
                params.url
            )));
        }

        let item_count = session.item_count;
        let id = deps
            .extractions
            .insert(NewExtraction::from_thread(&params.url, session.output))
            .await?;

        info!(task_id = %task.id, extraction_id = %id, item_count, "extraction persisted");

        Ok(HandlerOutput::Extraction { id, item_count })
    }
}
