//! Feed reader.
//!
//! Downloads the source feed (RSS or Atom) and turns it into an ordered list
//! of [`FeedEntry`] values, capped at the configured maximum. A feed that
//! cannot be fetched or parsed yields zero entries: the run then publishes an
//! empty article list instead of failing.

use crate::models::FeedEntry;
use feed_rs::parser;
use reqwest::Client;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// Default number of entries taken from the front of the feed.
pub const DEFAULT_MAX_ARTICLES: usize = 50;

/// Parse feed bytes into at most `max` entries, in feed order.
///
/// Missing titles become empty strings and missing links become empty
/// strings (such entries later fail navigation and are skipped). The publish
/// time falls back to the entry's updated time.
///
/// # Arguments
///
/// * `bytes` - An RSS 0.9x/1.0/2.0 or Atom document
/// * `max` - Maximum number of entries to keep
///
/// # Returns
///
/// The first `max` entries, or the parser's error for a malformed document.
pub fn parse(bytes: &[u8], max: usize) -> Result<Vec<FeedEntry>, Box<dyn Error>> {
    let feed = parser::parse(bytes)?;

    let entries = feed
        .entries
        .into_iter()
        .take(max)
        .map(|entry| FeedEntry {
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            link: entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default(),
            published: entry.published.or(entry.updated),
        })
        .collect();

    Ok(entries)
}

async fn fetch(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> Result<Vec<u8>, Box<dyn Error>> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?;
    let bytes = response.bytes().await?;
    debug!(bytes = bytes.len(), "Downloaded feed");
    Ok(bytes.to_vec())
}

/// Fetch and parse the feed at `url`.
///
/// Never fails: network and parse errors are logged and produce an empty
/// list, which callers treat as a valid outcome.
#[instrument(level = "info", skip(client, timeout))]
pub async fn read_feed(
    client: &Client,
    url: &str,
    max: usize,
    timeout: Duration,
) -> Vec<FeedEntry> {
    let bytes = match fetch(client, url, timeout).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "Feed fetch failed; continuing with no entries");
            return Vec::new();
        }
    };

    match parse(&bytes, max) {
        Ok(entries) => {
            info!(count = entries.len(), "Read feed entries");
            entries
        }
        Err(e) => {
            error!(error = %e, "Feed parse failed; continuing with no entries");
            Vec::new()
        }
    }
}
