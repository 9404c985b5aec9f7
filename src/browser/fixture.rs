//! In-memory page engine for tests.
//!
//! Serves canned documents per URL with an optional simulated load time, and
//! tracks how many page contexts are open at once.
//!
//! Routes can misbehave in two ways: a slow load honours the navigation
//! timeout like a real engine would, while a stalled page loads at once and
//! then hangs on every DOM read, ignoring any timeout of its own.

use super::{Browser, BrowserError, PageContext, WaitUntil, query_attribute, query_text};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Response {
    Document(Arc<str>),
    Fail(BrowserError),
}

#[derive(Debug, Clone)]
struct Route {
    response: Response,
    delay: Duration,
    stall: Duration,
}

#[derive(Debug, Default)]
struct Counters {
    open: AtomicUsize,
    peak: AtomicUsize,
    navigations: AtomicUsize,
}

/// A fixture engine mapping URLs to documents or failures.
#[derive(Debug, Clone, Default)]
pub struct FixtureBrowser {
    routes: Arc<HashMap<String, Route>>,
    counters: Arc<Counters>,
}

impl FixtureBrowser {
    /// An engine with no routes: every navigation fails with a network error.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` at `url` immediately.
    pub fn page(self, url: &str, html: &str) -> Self {
        self.slow_page(url, html, Duration::ZERO)
    }

    /// Serve `html` at `url` after `delay`.
    pub fn slow_page(self, url: &str, html: &str, delay: Duration) -> Self {
        self.route(url, Route {
            response: Response::Document(Arc::from(html)),
            delay,
            stall: Duration::ZERO,
        })
    }

    /// Serve `html` at `url` immediately, then hang for `stall` on every
    /// read of the loaded page.
    pub fn stalled_page(self, url: &str, html: &str, stall: Duration) -> Self {
        self.route(url, Route {
            response: Response::Document(Arc::from(html)),
            delay: Duration::ZERO,
            stall,
        })
    }

    /// Fail every navigation to `url` with `error`.
    pub fn failing(self, url: &str, error: BrowserError) -> Self {
        self.route(url, Route {
            response: Response::Fail(error),
            delay: Duration::ZERO,
            stall: Duration::ZERO,
        })
    }

    fn route(mut self, url: &str, route: Route) -> Self {
        Arc::make_mut(&mut self.routes).insert(url.to_string(), route);
        self
    }

    /// Highest number of page contexts that were open simultaneously.
    pub fn peak_open_pages(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    /// Page contexts currently open.
    pub fn open_pages(&self) -> usize {
        self.counters.open.load(Ordering::SeqCst)
    }

    /// Navigations attempted so far.
    pub fn navigations(&self) -> usize {
        self.counters.navigations.load(Ordering::SeqCst)
    }
}

impl Browser for FixtureBrowser {
    type Page = FixturePage;

    async fn new_page(&self) -> Result<FixturePage, BrowserError> {
        let open = self.counters.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(open, Ordering::SeqCst);
        Ok(FixturePage {
            routes: Arc::clone(&self.routes),
            counters: Arc::clone(&self.counters),
            document: None,
            stall: Duration::ZERO,
        })
    }
}

/// A page context of [`FixtureBrowser`].
#[derive(Debug)]
pub struct FixturePage {
    routes: Arc<HashMap<String, Route>>,
    counters: Arc<Counters>,
    document: Option<Arc<str>>,
    stall: Duration,
}

impl FixturePage {
    async fn loaded(&self) -> Result<Arc<str>, BrowserError> {
        let document = self.document.clone().ok_or(BrowserError::NoDocument)?;
        if !self.stall.is_zero() {
            tokio::time::sleep(self.stall).await;
        }
        Ok(document)
    }
}

impl Drop for FixturePage {
    fn drop(&mut self) {
        self.counters.open.fetch_sub(1, Ordering::SeqCst);
    }
}

impl PageContext for FixturePage {
    async fn navigate(
        &mut self,
        url: &str,
        timeout: Duration,
        _wait_until: WaitUntil,
    ) -> Result<(), BrowserError> {
        self.counters.navigations.fetch_add(1, Ordering::SeqCst);
        self.document = None;
        self.stall = Duration::ZERO;

        let route = self.routes.get(url).cloned().ok_or_else(|| BrowserError::Network {
            url: url.to_string(),
            message: "no route".to_string(),
        })?;

        if route.delay > timeout {
            tokio::time::sleep(timeout).await;
            return Err(BrowserError::Timeout {
                url: url.to_string(),
                after: timeout,
            });
        }
        tokio::time::sleep(route.delay).await;

        match route.response {
            Response::Document(html) => {
                self.document = Some(html);
                self.stall = route.stall;
                Ok(())
            }
            Response::Fail(error) => Err(error),
        }
    }

    async fn read_text(&self, selector: &str) -> Result<String, BrowserError> {
        query_text(self.loaded().await?, selector).await
    }

    async fn read_attribute(
        &self,
        selector: &str,
        attr: &str,
    ) -> Result<Option<String>, BrowserError> {
        query_attribute(self.loaded().await?, selector, attr).await
    }

    async fn content(&self) -> Result<String, BrowserError> {
        self.loaded().await.map(|document| document.to_string())
    }
}
