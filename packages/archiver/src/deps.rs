//! Dependency container for the processor and handlers.
//!
//! All external services sit behind traits so tests can inject doubles.
//! Construction is explicit — callers build one [`Deps`] and hand it to
//! every component that needs it.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use browserd_client::{BrowserdClient, PageSession};

use crate::llm::Completion;
use crate::records::ExtractionStore;
use crate::scrape::{BrowserAutomation, PageHandle, ScrollConfig};
use crate::tasks::TaskStore;

/// Key browserd presses for one scroll action.
const SCROLL_KEY: &str = "PageDown";

// =============================================================================
// BrowserdClient adapter (implements BrowserAutomation trait)
// =============================================================================

/// Wrapper around [`BrowserdClient`] that implements the automation trait.
pub struct BrowserdAdapter(pub Arc<BrowserdClient>);

impl BrowserdAdapter {
    pub fn new(client: Arc<BrowserdClient>) -> Self {
        Self(client)
    }

    fn session(page: &PageHandle) -> PageSession {
        PageSession {
            id: page.0.clone(),
        }
    }
}

#[async_trait]
impl BrowserAutomation for BrowserdAdapter {
    async fn open_page(&self, url: &str) -> Result<PageHandle> {
        let session = self.0.open_page(url).await?;
        Ok(PageHandle(session.id))
    }

    async fn snapshot(&self, page: &PageHandle) -> Result<String> {
        Ok(self.0.snapshot(&Self::session(page)).await?)
    }

    async fn press_scroll_key(&self, page: &PageHandle) -> Result<()> {
        self.0.press_key(&Self::session(page), SCROLL_KEY).await?;
        Ok(())
    }

    async fn wait(&self, page: &PageHandle, ms: u64) -> Result<()> {
        self.0.wait(&Self::session(page), ms).await?;
        Ok(())
    }

    async fn close(&self, page: PageHandle) -> Result<()> {
        self.0.close_page(PageSession { id: page.0 }).await?;
        Ok(())
    }
}

// =============================================================================
// Deps
// =============================================================================

/// Dependencies shared by the processor and every task handler.
#[derive(Clone)]
pub struct Deps {
    pub tasks: Arc<dyn TaskStore>,
    pub extractions: Arc<dyn ExtractionStore>,
    pub browser: Arc<dyn BrowserAutomation>,
    pub ai: Arc<dyn Completion>,
    /// Session defaults for the scroll engine; extract params may override.
    pub scroll: ScrollConfig,
}

impl Deps {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        extractions: Arc<dyn ExtractionStore>,
        browser: Arc<dyn BrowserAutomation>,
        ai: Arc<dyn Completion>,
        scroll: ScrollConfig,
    ) -> Self {
        Self {
            tasks,
            extractions,
            browser,
            ai,
            scroll,
        }
    }
}
