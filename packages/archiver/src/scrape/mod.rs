//! Incremental feed scraping.
//!
//! [`ScrollEngine`] drives a remote page through the automation service:
//! snapshot, parse, dedup, scroll, repeat until the feed runs dry. What gets
//! parsed out of a snapshot is a [`PageCollector`] concern, with one
//! implementation per scraped entity kind ([`ThreadCollector`],
//! [`FollowingCollector`]).

mod engine;
mod following;
mod thread;

pub use engine::{
    KeylessPolicy, PageCollector, ScrollConfig, ScrollEngine, SessionResult, Snapshot,
};
pub use following::{FollowedUser, FollowingCollector};
pub use thread::{LinkCard, MediaItem, ThreadCollector, Tweet};

use anyhow::Result;
use async_trait::async_trait;

/// Handle for one remote page session.
///
/// Obtained from [`BrowserAutomation::open_page`] and consumed by
/// [`BrowserAutomation::close`]; every handle must eventually be closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHandle(pub String);

/// Remote page automation.
///
/// Thin seam over the browser-automation service. One page handle is driven
/// strictly sequentially: scroll steps are never issued concurrently against
/// the same page.
#[async_trait]
pub trait BrowserAutomation: Send + Sync {
    /// Open a remote page and return its handle.
    async fn open_page(&self, url: &str) -> Result<PageHandle>;

    /// Serialize the page's current DOM.
    async fn snapshot(&self, page: &PageHandle) -> Result<String>;

    /// Send one scroll key press to the page.
    async fn press_scroll_key(&self, page: &PageHandle) -> Result<()>;

    /// Let the page settle for `ms` milliseconds.
    async fn wait(&self, page: &PageHandle, ms: u64) -> Result<()>;

    /// Release the remote page. Consumes the handle.
    async fn close(&self, page: PageHandle) -> Result<()>;
}

/// Marker text injected by the feed once real content ends and algorithmic
/// recommendations begin.
pub(crate) const DISCOVER_MORE_MARKER: &str = "Discover more";
