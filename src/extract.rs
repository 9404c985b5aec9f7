//! Field extractors for article pages.
//!
//! Every extractor fails closed: a missing tag, an unreadable page or a
//! malformed URL produces a safe default instead of an error.
//!
//! | Field | Function | Default |
//! |-------|----------|---------|
//! | press | [`press_name`] | best-effort host label |
//! | date | [`extract_date`] | the clock's current date |
//! | content | [`article_text`] | [`EXTRACTION_FAILED`] |
//! | image | [`find_image_url`] | empty string |

use crate::browser::PageContext;
use crate::models::FeedEntry;
use crate::utils::{ARTICLE_DATE_FORMAT, Clock, truncate_chars};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Node};
use tracing::debug;
use url::Url;

/// Default number of characters kept from an article body.
pub const DEFAULT_CONTENT_LIMIT: usize = 200;

/// Returned by [`article_text`] when the page content cannot be read.
pub const EXTRACTION_FAILED: &str = "extraction failed";

/// Text segments must be longer than this to be kept.
const MIN_SEGMENT_CHARS: usize = 30;

/// Subtrees that never carry article prose.
const NON_CONTENT_TAGS: [&str; 6] = ["script", "style", "noscript", "header", "footer", "nav"];

/// Host labels dropped before picking the press name.
const HOST_PREFIXES: [&str; 3] = ["www.", "m.", "mobile."];

const OG_IMAGE_SELECTOR: &str = "meta[property='og:image']";

static SPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

/// Derive a press name from an article URL.
///
/// Takes the URL's host, drops a leading `www.` (or mobile) label, and keeps
/// the first remaining dot-delimited label.
///
/// # Arguments
///
/// * `url` - The article link; need not be a valid URL
///
/// # Returns
///
/// A best-effort lowercase label, possibly empty. Never fails.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(press_name("https://www.yonhapnews.co.kr/article/1"), "yonhapnews");
/// assert_eq!(press_name("https://m.hani.co.kr/x"), "hani");
/// ```
pub fn press_name(url: &str) -> String {
    let host = Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_else(|| raw_host(url).to_lowercase());

    let mut host = host.as_str();
    for prefix in HOST_PREFIXES {
        if let Some(rest) = host.strip_prefix(prefix) {
            host = rest;
            break;
        }
    }

    host.split('.').next().unwrap_or_default().to_string()
}

/// Cut something host-like out of a string that is not a valid URL.
fn raw_host(url: &str) -> &str {
    let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or_default();
    host.split(':').next().unwrap_or_default()
}

/// Publication date of `entry` as `YYYYMMDD`.
///
/// Uses the entry's structured publish time (UTC). Entries without one are
/// dated with `clock.today()`, so their date depends on when the run
/// happens.
///
/// # Arguments
///
/// * `entry` - The feed entry being enriched
/// * `clock` - Fallback source of the current date
///
/// # Returns
///
/// An 8-digit `YYYYMMDD` string.
pub fn extract_date(entry: &FeedEntry, clock: &dyn Clock) -> String {
    match entry.published {
        Some(published) => published.format(ARTICLE_DATE_FORMAT).to_string(),
        None => clock.today().format(ARTICLE_DATE_FORMAT).to_string(),
    }
}

/// Bounded-length body text of the page currently loaded in `page`.
///
/// The document is parsed on the blocking pool, so a pathological page only
/// occupies one blocking thread while other entries keep running.
///
/// # Arguments
///
/// * `page` - A page context that completed a navigation
/// * `limit` - Maximum number of characters to keep
///
/// # Returns
///
/// The text built by [`text_from_html`], or [`EXTRACTION_FAILED`] when the
/// page content cannot be read.
pub async fn article_text<P: PageContext>(page: &P, limit: usize) -> String {
    let html = match page.content().await {
        Ok(html) => html,
        Err(e) => {
            debug!(error = %e, "Could not read page content");
            return EXTRACTION_FAILED.to_string();
        }
    };

    match tokio::task::spawn_blocking(move || text_from_html(&html, limit)).await {
        Ok(text) => text,
        Err(e) => {
            debug!(error = %e, "Text extraction aborted");
            EXTRACTION_FAILED.to_string()
        }
    }
}

/// Extract summary text from an HTML document.
///
/// 1. Drop `script`, `style`, `noscript`, `header`, `footer` and `nav` subtrees
/// 2. Take the remaining text nodes in document order, trimmed
/// 3. Split each node on runs of two or more spaces
/// 4. Keep trimmed segments longer than 30 characters, joined by a space
/// 5. Keep at most `limit` characters
///
/// A text node boundary always ends a segment, so short fragments such as
/// menu items or bylines are dropped even when they sit next to each other.
///
/// # Arguments
///
/// * `html` - A full document or a fragment
/// * `limit` - Maximum number of characters to keep
///
/// # Returns
///
/// The kept text, possibly empty.
pub fn text_from_html(html: &str, limit: usize) -> String {
    let document = Html::parse_document(html);
    let kept = text_nodes(&document)
        .into_iter()
        .flat_map(|fragment| SPACE_RUNS.split(fragment))
        .map(str::trim)
        .filter(|segment| segment.chars().count() > MIN_SEGMENT_CHARS)
        .collect::<Vec<_>>()
        .join(" ");

    truncate_chars(&kept, limit).to_string()
}

/// Non-empty trimmed text nodes outside [`NON_CONTENT_TAGS`], in document
/// order.
///
/// Walks with an explicit stack: nesting depth is attacker-controlled.
fn text_nodes(document: &Html) -> Vec<&str> {
    let mut out = Vec::new();
    let mut stack = vec![*document.root_element()];

    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    out.push(trimmed);
                }
            }
            Node::Element(element) if !NON_CONTENT_TAGS.contains(&element.name()) => {
                stack.extend(node.children().rev());
            }
            _ => {}
        }
    }
    out
}

/// The page's Open Graph image, or an empty string.
///
/// Only absolute `http`/`https` values are accepted; a missing tag, a
/// missing `content` attribute or a relative path all yield `""`.
///
/// # Returns
///
/// The `content` of the first `meta[property='og:image']`, or `""`.
pub async fn find_image_url<P: PageContext>(page: &P) -> String {
    match page.read_attribute(OG_IMAGE_SELECTOR, "content").await {
        Ok(Some(content)) if content.starts_with("http") => content,
        Ok(_) => String::new(),
        Err(e) => {
            debug!(error = %e, "No og:image on page");
            String::new()
        }
    }
}
