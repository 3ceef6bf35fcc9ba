//! Tweet-thread collector.
//!
//! Parses feed snapshots into [`Tweet`]s. The natural key is the status
//! link, which stays stable across overlapping snapshots while the feed
//! scrolls.

use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use super::engine::{PageCollector, Snapshot};
use super::DISCOVER_MORE_MARKER;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaItem {
    Photo { url: String },
    Video { url: String },
}

/// Link-preview card attached to a tweet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkCard {
    pub url: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tweet {
    /// Status link; the natural key for dedup.
    pub status_url: String,
    pub author_name: String,
    pub author_handle: String,
    /// Raw inner markup of the tweet text node, formatted downstream.
    pub text_html: String,
    pub media: Vec<MediaItem>,
    pub card: Option<LinkCard>,
}

/// Collector for tweet threads and feeds.
pub struct ThreadCollector;

impl ThreadCollector {
    fn parse_tweet_cell(cell: &ElementRef) -> Result<Option<Tweet>> {
        let article_sel = sel(r#"article[data-testid="tweet"]"#)?;
        let Some(article) = cell.select(&article_sel).next() else {
            return Ok(None);
        };

        let link_sel = sel("a[href]")?;
        let status_url = article
            .select(&link_sel)
            .filter_map(|a| a.value().attr("href"))
            .find(|href| href.contains("/status/"))
            .map(normalize_status_url)
            .unwrap_or_default();

        let (author_name, author_handle) = Self::parse_author(&article)?;

        let text_sel = sel(r#"div[data-testid="tweetText"]"#)?;
        let text_html = article
            .select(&text_sel)
            .next()
            .map(|node| node.inner_html())
            .unwrap_or_default();

        let mut media = Vec::new();
        let photo_sel = sel("img[src]")?;
        for img in article.select(&photo_sel) {
            if let Some(src) = img.value().attr("src") {
                if src.contains("/media/") {
                    media.push(MediaItem::Photo {
                        url: src.to_string(),
                    });
                }
            }
        }
        let video_sel = sel("video")?;
        let source_sel = sel("source[src]")?;
        for video in article.select(&video_sel) {
            let url = video
                .value()
                .attr("poster")
                .map(str::to_string)
                .or_else(|| {
                    video
                        .select(&source_sel)
                        .next()
                        .and_then(|s| s.value().attr("src"))
                        .map(str::to_string)
                });
            if let Some(url) = url {
                media.push(MediaItem::Video { url });
            }
        }

        let card = Self::parse_card(&article)?;

        Ok(Some(Tweet {
            status_url,
            author_name,
            author_handle,
            text_html,
            media,
            card,
        }))
    }

    fn parse_author(article: &ElementRef) -> Result<(String, String)> {
        let author_sel = sel(r#"div[data-testid="User-Name"]"#)?;
        let span_sel = sel("span")?;

        let mut name = String::new();
        let mut handle = String::new();
        if let Some(block) = article.select(&author_sel).next() {
            for span in block.select(&span_sel) {
                let text: String = span.text().collect::<String>().trim().to_string();
                if text.is_empty() {
                    continue;
                }
                if text.starts_with('@') {
                    if handle.is_empty() {
                        handle = text;
                    }
                } else if name.is_empty() {
                    name = text;
                }
            }
        }
        Ok((name, handle))
    }

    fn parse_card(article: &ElementRef) -> Result<Option<LinkCard>> {
        let card_sel = sel(r#"div[data-testid="card.wrapper"]"#)?;
        let Some(card) = article.select(&card_sel).next() else {
            return Ok(None);
        };

        let link_sel = sel("a[href]")?;
        let url = card
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .unwrap_or_default()
            .to_string();

        let span_sel = sel("span")?;
        let texts: Vec<String> = card
            .select(&span_sel)
            .map(|s| s.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        Ok(Some(LinkCard {
            url,
            title: texts.first().cloned().unwrap_or_default(),
            description: texts.last().cloned().unwrap_or_default(),
        }))
    }
}

impl PageCollector for ThreadCollector {
    type Item = Tweet;
    type Output = Vec<Tweet>;

    fn parse_snapshot(&self, html: &str) -> Result<Snapshot<Tweet>> {
        let document = Html::parse_document(html);
        let cell_sel = sel(r#"div[data-testid="cellInnerDiv"]"#)?;

        let mut items = Vec::new();
        let mut boundary_index = None;
        for cell in document.select(&cell_sel) {
            if is_boundary_cell(&cell) {
                boundary_index.get_or_insert(items.len());
                continue;
            }
            if let Some(tweet) = Self::parse_tweet_cell(&cell)? {
                items.push(tweet);
            }
        }

        Ok(Snapshot {
            items,
            boundary_index,
        })
    }

    fn natural_key(&self, item: &Tweet) -> Option<String> {
        if item.status_url.is_empty() {
            None
        } else {
            Some(item.status_url.clone())
        }
    }

    fn build_result(&self, items: Vec<Tweet>) -> Vec<Tweet> {
        items
    }
}

pub(crate) fn sel(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {:?}: {}", css, e))
}

/// The feed marks the start of its recommendation section with a heading.
pub(crate) fn is_boundary_cell(cell: &ElementRef) -> bool {
    let Ok(heading_sel) = Selector::parse("h2") else {
        return false;
    };
    cell.select(&heading_sel)
        .any(|h| h.text().collect::<String>().contains(DISCOVER_MORE_MARKER))
}

fn normalize_status_url(href: &str) -> String {
    href.split('?').next().unwrap_or(href).to_string()
}
