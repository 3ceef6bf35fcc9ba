//! Deterministic Markdown rendering for extracted threads.
//!
//! Scoped to the markup subset the extraction engine itself emits — this is
//! not a general HTML-to-Markdown conversion. Emoji images collapse to their
//! alt text, mention/hashtag anchors stay bare, other anchors become
//! `[text](href)` links, every remaining tag is stripped, and the line
//! re-flow turns `•` bullets into list items, blank lines into paragraph
//! breaks, and adjacent text lines into hard line-breaks.

use scraper::{ElementRef, Html, Node};

use crate::scrape::{MediaItem, Tweet};

/// Render a whole thread; items are joined with a horizontal rule.
pub fn thread_to_markdown(tweets: &[Tweet]) -> String {
    tweets
        .iter()
        .map(tweet_to_markdown)
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Render one tweet: text, then media lines, then the link-preview card.
pub fn tweet_to_markdown(tweet: &Tweet) -> String {
    let mut sections = Vec::new();

    let text = reflow(&text_html_to_text(&tweet.text_html));
    if !text.is_empty() {
        sections.push(text);
    }

    let media: Vec<String> = tweet
        .media
        .iter()
        .map(|item| match item {
            MediaItem::Photo { url } => format!("![image]({})", url),
            MediaItem::Video { url } => format!("[video]({})", url),
        })
        .collect();
    if !media.is_empty() {
        sections.push(media.join("\n"));
    }

    if let Some(card) = &tweet.card {
        sections.push(format!(
            "**[{}]({})**\n{}",
            card.title, card.url, card.description
        ));
    }

    sections.join("\n\n")
}

/// Flatten the tweet-text markup into plain text with Markdown links.
///
/// The HTML parser decodes the standard entities; this walk handles the
/// element subset and strips everything else.
fn text_html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::new();
    render_children(fragment.root_element(), &mut out);
    out
}

fn render_children(parent: ElementRef, out: &mut String) {
    for child in parent.children() {
        if let Some(element) = ElementRef::wrap(child) {
            render_element(element, out);
        } else if let Node::Text(text) = child.value() {
            out.push_str(text);
        }
    }
}

fn render_element(element: ElementRef, out: &mut String) {
    match element.value().name() {
        // Emoji are rendered as <img> with the character in alt.
        "img" => out.push_str(element.value().attr("alt").unwrap_or_default()),
        "br" => out.push('\n'),
        "a" => {
            let mut text = String::new();
            render_children(element, &mut text);
            if text.starts_with('@') || text.starts_with('#') {
                out.push_str(&text);
            } else if let Some(href) = element.value().attr("href") {
                out.push_str(&format!("[{}]({})", text, href));
            } else {
                out.push_str(&text);
            }
        }
        "p" | "div" => {
            render_children(element, out);
            out.push_str("\n\n");
        }
        _ => render_children(element, out),
    }
}

/// Truncate to a byte budget without splitting a character.
pub fn truncate_content(content: &str, max_bytes: usize) -> &str {
    if content.len() <= max_bytes {
        content
    } else {
        content
            .char_indices()
            .take_while(|(i, _)| *i < max_bytes)
            .last()
            .map(|(i, c)| &content[..i + c.len_utf8()])
            .unwrap_or(content)
    }
}

/// Re-flow plain text lines into Markdown blocks.
fn reflow(text: &str) -> String {
    let mut blocks: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix('•') {
            current.push(format!("- {}", rest.trim_start()));
        } else {
            current.push(line.to_string());
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
        .iter()
        .map(|lines| join_block(lines))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Join the lines of one block: list items with plain newlines, adjacent
/// text lines with a hard line-break (two trailing spaces).
fn join_block(lines: &[String]) -> String {
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        out.push_str(line);
        if i + 1 < lines.len() {
            let is_list = line.starts_with("- ") || lines[i + 1].starts_with("- ");
            if is_list {
                out.push('\n');
            } else {
                out.push_str("  \n");
            }
        }
    }
    out
}
