//! Page engine capability used by the pipeline.
//!
//! The collector and the weather probe never talk to a concrete engine. They
//! only need to open an isolated page context, navigate it, and read the
//! resulting DOM:
//!
//! | Operation | Purpose |
//! |-----------|---------|
//! | [`Browser::new_page`] | Open a fresh page context owned by one task |
//! | [`PageContext::navigate`] | Load a URL, bounded by a timeout |
//! | [`PageContext::read_text`] | Text of the first element matching a selector |
//! | [`PageContext::read_attribute`] | Attribute of the first matching element |
//! | [`PageContext::content`] | The loaded document as HTML |
//!
//! [`http::HttpBrowser`] is the engine shipped with the binary. Tests drive the
//! pipeline through an in-memory fixture engine instead.

use scraper::{Html, Selector};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod http;

#[cfg(test)]
pub mod fixture;

/// The load condition a navigation waits for before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// The initial document has been parsed. Subresources may still be loading.
    DomContentLoaded,
    /// The document and its subresources have loaded.
    Load,
    /// No network activity for a short while.
    NetworkIdle,
}

impl fmt::Display for WaitUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaitUntil::DomContentLoaded => "domcontentloaded",
            WaitUntil::Load => "load",
            WaitUntil::NetworkIdle => "networkidle",
        };
        f.write_str(name)
    }
}

/// Failures reported by a page engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrowserError {
    /// The navigation did not complete within its timeout.
    #[error("navigation to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },
    /// DNS, connection or transfer failure.
    #[error("network error while loading {url}: {message}")]
    Network { url: String, message: String },
    /// The server answered with a non-success status.
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },
    /// The document is larger than the engine accepts.
    #[error("{url} is larger than {limit} bytes")]
    TooLarge { url: String, limit: usize },
    /// No element matched the selector.
    #[error("no element matches `{selector}`")]
    NotFound { selector: String },
    /// The selector could not be parsed.
    #[error("invalid selector `{selector}`: {message}")]
    InvalidSelector { selector: String, message: String },
    /// A read was attempted before any successful navigation.
    #[error("no document loaded")]
    NoDocument,
    /// The engine itself could not be set up or used.
    #[error("page engine error: {0}")]
    Engine(String),
}

impl BrowserError {
    /// A short, stable label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            BrowserError::Timeout { .. } => "timeout",
            BrowserError::Network { .. } => "network",
            BrowserError::Status { .. } => "status",
            BrowserError::TooLarge { .. } => "too_large",
            BrowserError::NotFound { .. } => "not_found",
            BrowserError::InvalidSelector { .. } => "invalid_selector",
            BrowserError::NoDocument => "no_document",
            BrowserError::Engine(_) => "engine",
        }
    }
}

/// A page engine able to hand out isolated page contexts.
#[allow(async_fn_in_trait)]
pub trait Browser {
    type Page: PageContext;

    /// Open a new page context. Each context keeps its own document, so
    /// navigations in one never leak into another.
    async fn new_page(&self) -> Result<Self::Page, BrowserError>;
}

/// One page context: a single document at a time.
#[allow(async_fn_in_trait)]
pub trait PageContext {
    /// Load `url`, waiting for `wait_until`, failing with
    /// [`BrowserError::Timeout`] once `timeout` elapses.
    async fn navigate(
        &mut self,
        url: &str,
        timeout: Duration,
        wait_until: WaitUntil,
    ) -> Result<(), BrowserError>;

    /// Text content of the first element matching `selector`.
    async fn read_text(&self, selector: &str) -> Result<String, BrowserError>;

    /// Attribute `attr` of the first element matching `selector`.
    ///
    /// Returns `Ok(None)` when the element exists but lacks the attribute.
    async fn read_attribute(&self, selector: &str, attr: &str)
    -> Result<Option<String>, BrowserError>;

    /// The currently loaded document as HTML.
    async fn content(&self) -> Result<String, BrowserError>;
}

fn parse_selector(selector: &str) -> Result<Selector, BrowserError> {
    Selector::parse(selector).map_err(|e| BrowserError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Text of the first element of `html` matching `selector`.
///
/// Shared by engines that keep the document as an HTML string. Parsing is
/// CPU-bound; async callers go through [`query_text`].
pub(crate) fn select_text(html: &str, selector: &str) -> Result<String, BrowserError> {
    let parsed = parse_selector(selector)?;
    let document = Html::parse_document(html);
    document
        .select(&parsed)
        .next()
        .map(|element| element.text().collect::<String>())
        .ok_or_else(|| BrowserError::NotFound {
            selector: selector.to_string(),
        })
}

/// Attribute of the first element of `html` matching `selector`.
pub(crate) fn select_attribute(
    html: &str,
    selector: &str,
    attr: &str,
) -> Result<Option<String>, BrowserError> {
    let parsed = parse_selector(selector)?;
    let document = Html::parse_document(html);
    document
        .select(&parsed)
        .next()
        .map(|element| element.value().attr(attr).map(str::to_string))
        .ok_or_else(|| BrowserError::NotFound {
            selector: selector.to_string(),
        })
}

/// Run [`select_text`] on the blocking pool.
///
/// A large or deeply nested document then stalls one blocking thread rather
/// than every task sharing the caller's executor thread.
///
/// # Arguments
///
/// * `document` - The loaded document, shared with the page context
/// * `selector` - A CSS selector
///
/// # Returns
///
/// The text of the first match, or the error [`select_text`] reports.
pub(crate) async fn query_text(
    document: Arc<str>,
    selector: &str,
) -> Result<String, BrowserError> {
    let selector = selector.to_string();
    tokio::task::spawn_blocking(move || select_text(&document, &selector))
        .await
        .map_err(|e| BrowserError::Engine(format!("DOM query aborted: {e}")))?
}

/// Run [`select_attribute`] on the blocking pool.
pub(crate) async fn query_attribute(
    document: Arc<str>,
    selector: &str,
    attr: &str,
) -> Result<Option<String>, BrowserError> {
    let selector = selector.to_string();
    let attr = attr.to_string();
    tokio::task::spawn_blocking(move || select_attribute(&document, &selector, &attr))
        .await
        .map_err(|e| BrowserError::Engine(format!("DOM query aborted: {e}")))?
}
