//! Test doubles for the external seams.
//!
//! These back the unit and integration suites so nothing needs a database,
//! a browser-automation service, or an LLM endpoint.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use crate::deps::Deps;
use crate::error::TaskError;
use crate::llm::Completion;
use crate::records::{ExtractionRecord, ExtractionStore, NewExtraction};
use crate::scrape::{BrowserAutomation, PageHandle, ScrollConfig};

pub use crate::tasks::MemoryTaskStore;

// =============================================================================
// MemoryExtractionStore
// =============================================================================

/// In-memory [`ExtractionStore`].
#[derive(Default)]
pub struct MemoryExtractionStore {
    records: Mutex<HashMap<Uuid, ExtractionRecord>>,
}

impl MemoryExtractionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ExtractionStore for MemoryExtractionStore {
    async fn insert(&self, new: NewExtraction) -> Result<Uuid, TaskError> {
        let id = Uuid::new_v4();
        let record = ExtractionRecord {
            id,
            source_url: new.source_url,
            author_name: new.author_name,
            author_handle: new.author_handle,
            tweet_count: new.thread.len() as i32,
            thread: Json(new.thread),
            preview_text: new.preview_text,
            created_at: Utc::now(),
        };
        self.records.lock().unwrap().insert(id, record);
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ExtractionRecord>, TaskError> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }
}

// =============================================================================
// MockAi
// =============================================================================

/// Scripted [`Completion`] double. Responses are served in order; prompts
/// are recorded for assertions.
#[derive(Default)]
pub struct MockAi {
    responses: Mutex<VecDeque<String>>,
    pub prompts: Mutex<Vec<String>>,
}

impl MockAi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(response: impl Into<String>) -> Self {
        let ai = Self::new();
        ai.push_response(response);
        ai
    }

    pub fn push_response(&self, response: impl Into<String>) {
        self.responses.lock().unwrap().push_back(response.into());
    }

    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completion for MockAi {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("mock AI has no scripted response"))
    }
}

// =============================================================================
// ScriptedBrowser
// =============================================================================

/// Scripted [`BrowserAutomation`] double.
///
/// Serves the scripted snapshots in order and repeats the last one when the
/// script runs out, so the engine's zero-new-item termination kicks in.
/// Tracks opens/closes to assert the page is always released.
pub struct ScriptedBrowser {
    snapshots: Mutex<VecDeque<String>>,
    last_served: Mutex<Option<String>>,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub key_presses: AtomicUsize,
    fail_open: bool,
    /// Fail every snapshot call after this many have been served.
    fail_after: Option<usize>,
    served: AtomicUsize,
}

impl ScriptedBrowser {
    pub fn new<S: Into<String>>(snapshots: Vec<S>) -> Self {
        Self {
            snapshots: Mutex::new(snapshots.into_iter().map(Into::into).collect()),
            last_served: Mutex::new(None),
            opened: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            key_presses: AtomicUsize::new(0),
            fail_open: false,
            fail_after: None,
            served: AtomicUsize::new(0),
        }
    }

    /// A browser whose `open_page` always fails.
    pub fn failing_open() -> Self {
        let mut browser = Self::new(Vec::<String>::new());
        browser.fail_open = true;
        browser
    }

    /// Fail snapshot calls once `count` have been served.
    pub fn fail_snapshots_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserAutomation for ScriptedBrowser {
    async fn open_page(&self, url: &str) -> Result<PageHandle> {
        if self.fail_open {
            return Err(anyhow!("failed to open {}", url));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(PageHandle(format!("scripted-{}", url)))
    }

    async fn snapshot(&self, _page: &PageHandle) -> Result<String> {
        let served = self.served.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_after {
            if served >= limit {
                return Err(anyhow!("page session crashed"));
            }
        }

        let mut snapshots = self.snapshots.lock().unwrap();
        let mut last = self.last_served.lock().unwrap();
        if let Some(next) = snapshots.pop_front() {
            *last = Some(next.clone());
            Ok(next)
        } else {
            Ok(last.clone().unwrap_or_default())
        }
    }

    async fn press_scroll_key(&self, _page: &PageHandle) -> Result<()> {
        self.key_presses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn wait(&self, _page: &PageHandle, _ms: u64) -> Result<()> {
        Ok(())
    }

    async fn close(&self, _page: PageHandle) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Assembled test dependencies
// =============================================================================

/// Build a [`Deps`] wired entirely to in-memory doubles.
pub struct TestDeps {
    pub tasks: Arc<MemoryTaskStore>,
    pub extractions: Arc<MemoryExtractionStore>,
    pub browser: Arc<ScriptedBrowser>,
    pub ai: Arc<MockAi>,
}

impl TestDeps {
    pub fn new(browser: ScriptedBrowser, ai: MockAi) -> Self {
        Self {
            tasks: Arc::new(MemoryTaskStore::new()),
            extractions: Arc::new(MemoryExtractionStore::new()),
            browser: Arc::new(browser),
            ai: Arc::new(ai),
        }
    }

    /// The `Deps` view handed to processor and handlers.
    pub fn deps(&self) -> Deps {
        Deps::new(
            self.tasks.clone(),
            self.extractions.clone(),
            self.browser.clone(),
            self.ai.clone(),
            ScrollConfig {
                // keep test sessions short
                max_steps: 5,
                presses_per_step: 1,
                settle_ms: 0,
                max_items: None,
                keyless: Default::default(),
            },
        )
    }
}
