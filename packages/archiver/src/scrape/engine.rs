//! Generic scroll-collect-dedup loop.
//!
//! The engine owns the session protocol; collectors own the parsing. One
//! session = one remote page handle, driven strictly sequentially. The
//! per-session dedup sets are exclusively owned by the in-flight call and
//! need no locking.

use std::collections::HashSet;

use anyhow::{bail, Result};
use tracing::{debug, info};

use super::BrowserAutomation;

/// Items parsed out of one page snapshot, in render order.
///
/// `boundary_index` is the position of the first item at or after the
/// "discover more" recommendation marker, when the marker is visible.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub items: Vec<T>,
    pub boundary_index: Option<usize>,
}

impl<T> Snapshot<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            boundary_index: None,
        }
    }
}

/// Parsing and assembly for one scraped entity kind.
pub trait PageCollector: Send + Sync {
    type Item: Send;
    type Output: Send;

    /// Parse a serialized page snapshot into typed items.
    fn parse_snapshot(&self, html: &str) -> Result<Snapshot<Self::Item>>;

    /// Stable content-derived identifier used for session dedup.
    ///
    /// Items without a key are handled per [`KeylessPolicy`].
    fn natural_key(&self, item: &Self::Item) -> Option<String>;

    /// Assemble the final aggregate from everything collected.
    fn build_result(&self, items: Vec<Self::Item>) -> Self::Output;
}

/// What to do with a collected item that has no natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeylessPolicy {
    /// Drop the item; the session result carries the dropped count.
    #[default]
    Drop,
    /// Abort the scrape session.
    Fail,
}

#[derive(Debug, Clone)]
pub struct ScrollConfig {
    /// Ceiling on scroll steps per session.
    pub max_steps: u32,
    /// Key presses batched into one scroll step.
    pub presses_per_step: u32,
    /// Settle delay after each scroll step, in milliseconds.
    pub settle_ms: u64,
    /// Optional cap on collected items.
    pub max_items: Option<usize>,
    pub keyless: KeylessPolicy,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            max_steps: 30,
            presses_per_step: 3,
            settle_ms: 1200,
            max_items: None,
            keyless: KeylessPolicy::default(),
        }
    }
}

/// Outcome of one scrape session.
#[derive(Debug)]
pub struct SessionResult<T> {
    pub output: T,
    pub item_count: usize,
    pub steps_taken: u32,
    pub keyless_dropped: usize,
    pub boundary_seen: bool,
}

#[derive(Default)]
struct DedupState {
    /// Keys collected into the result. Grows monotonically; first sighting
    /// wins, later duplicates are silently dropped.
    seen: HashSet<String>,
    /// Keys sighted in the recommendation region. Permanently excluded.
    banned: HashSet<String>,
    boundary_tripped: bool,
    keyless_dropped: usize,
}

/// Scroll-collect-dedup-terminate loop over one remote page.
pub struct ScrollEngine {
    config: ScrollConfig,
}

impl ScrollEngine {
    pub fn new(config: ScrollConfig) -> Self {
        Self { config }
    }

    /// Run one scrape session against `url`.
    ///
    /// The page is released on every exit path, success or failure; any
    /// automation error propagates to the caller.
    pub async fn run<C: PageCollector>(
        &self,
        browser: &dyn BrowserAutomation,
        url: &str,
        collector: &C,
    ) -> Result<SessionResult<C::Output>> {
        let page = browser.open_page(url).await?;
        let outcome = self.collect_session(browser, &page, collector).await;
        let closed = browser.close(page).await;

        let (items, state, steps_taken) = outcome?;
        closed?;

        let item_count = items.len();
        info!(
            url = %url,
            items = item_count,
            steps = steps_taken,
            keyless_dropped = state.keyless_dropped,
            boundary_seen = state.boundary_tripped,
            "scrape session finished"
        );

        Ok(SessionResult {
            output: collector.build_result(items),
            item_count,
            steps_taken,
            keyless_dropped: state.keyless_dropped,
            boundary_seen: state.boundary_tripped,
        })
    }

    async fn collect_session<C: PageCollector>(
        &self,
        browser: &dyn BrowserAutomation,
        page: &super::PageHandle,
        collector: &C,
    ) -> Result<(Vec<C::Item>, DedupState, u32)> {
        let mut state = DedupState::default();
        let mut items: Vec<C::Item> = Vec::new();
        let mut steps_taken = 0u32;
        let mut zero_streak = 0u32;

        // Initial view before any scrolling.
        let html = browser.snapshot(page).await?;
        self.collect_from(collector, &html, &mut state, &mut items)?;

        while steps_taken < self.config.max_steps {
            if self.capped(&items) {
                break;
            }

            for _ in 0..self.config.presses_per_step {
                browser.press_scroll_key(page).await?;
            }
            browser.wait(page, self.config.settle_ms).await?;

            let html = browser.snapshot(page).await?;
            let added = self.collect_from(collector, &html, &mut state, &mut items)?;
            steps_taken += 1;

            debug!(step = steps_taken, added, total = items.len(), "scroll step");

            if added == 0 {
                zero_streak += 1;
                if zero_streak >= 2 {
                    break;
                }
            } else {
                zero_streak = 0;
            }
        }

        if let Some(cap) = self.config.max_items {
            items.truncate(cap);
        }

        Ok((items, state, steps_taken))
    }

    /// Parse one snapshot and merge its items into the session.
    ///
    /// Returns how many newly-deduplicated items the snapshot added.
    fn collect_from<C: PageCollector>(
        &self,
        collector: &C,
        html: &str,
        state: &mut DedupState,
        items: &mut Vec<C::Item>,
    ) -> Result<usize> {
        let snapshot = collector.parse_snapshot(html)?;
        let boundary_index = snapshot.boundary_index;
        let mut added = 0;

        for (index, item) in snapshot.items.into_iter().enumerate() {
            let in_flagged_region =
                state.boundary_tripped || boundary_index.is_some_and(|b| index >= b);

            let Some(key) = collector.natural_key(&item) else {
                match self.config.keyless {
                    KeylessPolicy::Drop => {
                        state.keyless_dropped += 1;
                        continue;
                    }
                    KeylessPolicy::Fail => bail!("collected item has no natural key"),
                }
            };

            if state.banned.contains(&key) {
                continue;
            }
            if in_flagged_region {
                state.banned.insert(key);
                continue;
            }
            if state.seen.insert(key) {
                if self.capped(items) {
                    continue;
                }
                items.push(item);
                added += 1;
            }
        }

        // Sticky: once the marker has rendered, everything below it in this
        // and every later snapshot is recommendation content.
        if boundary_index.is_some() {
            state.boundary_tripped = true;
        }

        Ok(added)
    }

    fn capped<T>(&self, items: &[T]) -> bool {
        self.config
            .max_items
            .is_some_and(|cap| items.len() >= cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Collector over newline-separated "key" lines; a line of `===` marks
    /// the recommendation boundary and `?` yields a keyless item.
    struct LineCollector;

    impl PageCollector for LineCollector {
        type Item = String;
        type Output = Vec<String>;

        fn parse_snapshot(&self, html: &str) -> Result<Snapshot<String>> {
            let mut items = Vec::new();
            let mut boundary_index = None;
            for line in html.lines().filter(|l| !l.trim().is_empty()) {
                if line.trim() == "===" {
                    boundary_index.get_or_insert(items.len());
                    continue;
                }
                items.push(line.trim().to_string());
            }
            Ok(Snapshot {
                items,
                boundary_index,
            })
        }

        fn natural_key(&self, item: &String) -> Option<String> {
            if item == "?" {
                None
            } else {
                Some(item.clone())
            }
        }

        fn build_result(&self, items: Vec<String>) -> Vec<String> {
            items
        }
    }

    fn engine(config: ScrollConfig) -> ScrollEngine {
        ScrollEngine::new(config)
    }

    fn collect(
        engine: &ScrollEngine,
        snapshots: &[&str],
    ) -> (Vec<String>, DedupState, Vec<usize>) {
        let mut state = DedupState::default();
        let mut items = Vec::new();
        let mut added = Vec::new();
        for html in snapshots {
            added.push(
                engine
                    .collect_from(&LineCollector, html, &mut state, &mut items)
                    .unwrap(),
            );
        }
        (items, state, added)
    }

    #[test]
    fn first_sighting_wins_and_duplicates_are_dropped() {
        let engine = engine(ScrollConfig::default());
        let (items, _, added) = collect(&engine, &["a\nb", "b\nc"]);
        assert_eq!(items, vec!["a", "b", "c"]);
        assert_eq!(added, vec![2, 1]);
    }

    #[test]
    fn unchanged_snapshot_adds_nothing() {
        let engine = engine(ScrollConfig::default());
        let (items, _, added) = collect(&engine, &["a\nb", "a\nb"]);
        assert_eq!(items, vec!["a", "b"]);
        assert_eq!(added[1], 0);
    }

    #[test]
    fn items_below_the_marker_are_banned_permanently() {
        let engine = engine(ScrollConfig::default());
        // "x" renders below the marker first, then above it in a later view.
        let (items, state, _) = collect(&engine, &["a\n===\nx", "x\nb"]);
        assert_eq!(items, vec!["a"]);
        assert!(state.boundary_tripped);
        assert!(state.banned.contains("x"));
        assert!(state.banned.contains("b"));
    }

    #[test]
    fn everything_after_the_marker_trips_is_excluded() {
        let engine = engine(ScrollConfig::default());
        let (items, _, added) = collect(&engine, &["a\n===", "b\nc"]);
        assert_eq!(items, vec!["a"]);
        assert_eq!(added[1], 0);
    }

    #[test]
    fn keyless_items_are_dropped_and_counted_by_default() {
        let engine = engine(ScrollConfig::default());
        let (items, state, _) = collect(&engine, &["a\n?\nb"]);
        assert_eq!(items, vec!["a", "b"]);
        assert_eq!(state.keyless_dropped, 1);
    }

    #[test]
    fn keyless_items_fail_the_session_under_strict_policy() {
        let engine = engine(ScrollConfig {
            keyless: KeylessPolicy::Fail,
            ..Default::default()
        });
        let mut state = DedupState::default();
        let mut items: Vec<String> = Vec::new();
        let result = engine.collect_from(&LineCollector, "a\n?", &mut state, &mut items);
        assert!(result.is_err());
    }

    #[test]
    fn item_cap_stops_collection() {
        let engine = engine(ScrollConfig {
            max_items: Some(2),
            ..Default::default()
        });
        let (items, _, _) = collect(&engine, &["a\nb\nc\nd"]);
        assert_eq!(items.len(), 2);
    }
}
