//! HTTP page engine.
//!
//! Fetches documents with `reqwest` and answers DOM queries with `scraper`.
//! Scripts are not executed, so every [`WaitUntil`] condition is met as soon
//! as the response body has been received. Client-side redirects and
//! script-inserted tags are therefore invisible to this engine.
//!
//! Bodies are decoded with the charset named by the `Content-Type` header,
//! then by a `<meta charset>` near the top of the document, then as UTF-8.

use super::{Browser, BrowserError, PageContext, WaitUntil, query_attribute, query_text};
use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Largest document a page context accepts (5 MiB).
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 5 * 1024 * 1024;

/// How much of the body is searched for a `<meta charset>` declaration.
const CHARSET_SNIFF_BYTES: usize = 4096;

static META_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([\w.:-]+)"#).unwrap());

/// Engine backed by a shared HTTP client.
///
/// The client and its connection pool are shared; each page context
/// keeps its own document.
#[derive(Debug, Clone)]
pub struct HttpBrowser {
    client: Client,
    max_document_bytes: usize,
}

impl HttpBrowser {
    /// Build an engine that identifies itself with `user_agent`.
    ///
    /// # Arguments
    ///
    /// * `user_agent` - Sent as the `User-Agent` header of every request
    ///
    /// # Returns
    ///
    /// The engine, or [`BrowserError::Engine`] if the TLS backend cannot be
    /// initialised.
    pub fn new(user_agent: &str) -> Result<Self, BrowserError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| BrowserError::Engine(e.to_string()))?;
        Ok(Self {
            client,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        })
    }

    /// Reject documents larger than `limit` bytes with
    /// [`BrowserError::TooLarge`].
    pub fn with_max_document_bytes(mut self, limit: usize) -> Self {
        self.max_document_bytes = limit;
        self
    }

    /// The underlying client, reused for fetching the feed itself.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Browser for HttpBrowser {
    type Page = HttpPage;

    async fn new_page(&self) -> Result<HttpPage, BrowserError> {
        Ok(HttpPage {
            client: self.client.clone(),
            max_document_bytes: self.max_document_bytes,
            url: None,
            document: None,
        })
    }
}

/// A page context holding the last successfully loaded document.
#[derive(Debug)]
pub struct HttpPage {
    client: Client,
    max_document_bytes: usize,
    url: Option<String>,
    document: Option<Arc<str>>,
}

impl HttpPage {
    /// The URL of the loaded document, if any.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn document(&self) -> Result<Arc<str>, BrowserError> {
        self.document.clone().ok_or(BrowserError::NoDocument)
    }

    async fn fetch(&self, url: &str) -> Result<String, BrowserError> {
        let network = |e: reqwest::Error| BrowserError::Network {
            url: url.to_string(),
            message: e.to_string(),
        };
        let too_large = || BrowserError::TooLarge {
            url: url.to_string(),
            limit: self.max_document_bytes,
        };

        let mut response = self.client.get(url).send().await.map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(BrowserError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        if response
            .content_length()
            .is_some_and(|len| len > self.max_document_bytes as u64)
        {
            return Err(too_large());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(network)? {
            if body.len() + chunk.len() > self.max_document_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(decode_body(&body, content_type.as_deref()))
    }
}

/// Decode an HTML body to text.
///
/// # Arguments
///
/// * `body` - The raw response bytes
/// * `content_type` - The `Content-Type` header, if the server sent one
///
/// # Returns
///
/// The decoded document. Bytes invalid in the chosen encoding become U+FFFD.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(header_encoding)
        .or_else(|| meta_encoding(body))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(body);
    text.into_owned()
}

fn header_encoding(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .skip(1)
        .find_map(|param| {
            let (name, value) = param.split_once('=')?;
            name.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches(['"', '\'']))
        })
        .and_then(|label| Encoding::for_label(label.as_bytes()))
}

fn meta_encoding(body: &[u8]) -> Option<&'static Encoding> {
    let head = String::from_utf8_lossy(&body[..body.len().min(CHARSET_SNIFF_BYTES)]);
    let label = META_CHARSET.captures(&head)?.get(1)?;
    Encoding::for_label(label.as_str().as_bytes())
}

impl PageContext for HttpPage {
    #[instrument(level = "debug", skip(self))]
    async fn navigate(
        &mut self,
        url: &str,
        timeout: Duration,
        wait_until: WaitUntil,
    ) -> Result<(), BrowserError> {
        // A failed navigation leaves the page blank rather than showing the
        // previous document.
        self.url = None;
        self.document = None;

        let body = tokio::time::timeout(timeout, self.fetch(url))
            .await
            .map_err(|_| BrowserError::Timeout {
                url: url.to_string(),
                after: timeout,
            })??;

        debug!(bytes = body.len(), "Loaded document");
        self.url = Some(url.to_string());
        self.document = Some(Arc::from(body));
        Ok(())
    }

    async fn read_text(&self, selector: &str) -> Result<String, BrowserError> {
        query_text(self.document()?, selector).await
    }

    async fn read_attribute(
        &self,
        selector: &str,
        attr: &str,
    ) -> Result<Option<String>, BrowserError> {
        query_attribute(self.document()?, selector, attr).await
    }

    async fn content(&self) -> Result<String, BrowserError> {
        self.document().map(|document| document.to_string())
    }
}
