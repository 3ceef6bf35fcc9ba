//! Followed-user list collector.
//!
//! Parses a following/followers page into [`FollowedUser`]s. The natural key
//! is the user's handle, which is stable across snapshots.

use anyhow::Result;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

use super::engine::{PageCollector, Snapshot};
use super::thread::{is_boundary_cell, sel};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FollowedUser {
    /// Handle without the leading `@`; the natural key for dedup.
    pub handle: String,
    pub display_name: String,
    pub bio: String,
}

/// Collector for followed-user lists.
pub struct FollowingCollector;

impl FollowingCollector {
    fn parse_user_cell(cell: &ElementRef) -> Result<Option<FollowedUser>> {
        let user_sel = sel(r#"[data-testid="UserCell"]"#)?;
        let Some(user) = cell.select(&user_sel).next() else {
            return Ok(None);
        };

        let link_sel = sel("a[href]")?;
        let handle = user
            .select(&link_sel)
            .filter_map(|a| a.value().attr("href"))
            .map(|href| href.trim_start_matches('/'))
            .find(|path| !path.is_empty() && !path.contains('/'))
            .unwrap_or_default()
            .to_string();

        let span_sel = sel("span")?;
        let display_name = user
            .select(&span_sel)
            .map(|s| s.text().collect::<String>().trim().to_string())
            .find(|t| !t.is_empty() && !t.starts_with('@'))
            .unwrap_or_default();

        let bio_sel = sel(r#"[data-testid="userDescription"]"#)?;
        let bio = user
            .select(&bio_sel)
            .next()
            .map(|node| node.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        Ok(Some(FollowedUser {
            handle,
            display_name,
            bio,
        }))
    }
}

impl PageCollector for FollowingCollector {
    type Item = FollowedUser;
    type Output = Vec<FollowedUser>;

    fn parse_snapshot(&self, html: &str) -> Result<Snapshot<FollowedUser>> {
        let document = Html::parse_document(html);
        let cell_sel = sel(r#"div[data-testid="cellInnerDiv"]"#)?;

        let mut items = Vec::new();
        let mut boundary_index = None;
        for cell in document.select(&cell_sel) {
            if is_boundary_cell(&cell) {
                boundary_index.get_or_insert(items.len());
                continue;
            }
            if let Some(user) = Self::parse_user_cell(&cell)? {
                items.push(user);
            }
        }

        Ok(Snapshot {
            items,
            boundary_index,
        })
    }

    fn natural_key(&self, item: &FollowedUser) -> Option<String> {
        if item.handle.is_empty() {
            None
        } else {
            Some(item.handle.clone())
        }
    }

    fn build_result(&self, items: Vec<FollowedUser>) -> Vec<FollowedUser> {
        items
    }
}
