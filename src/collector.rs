//! Article collector.
//!
//! Visits every feed entry through its own page context and decides whether
//! it becomes an [`Article`]. The flow for one entry is:
//!
//! ```text
//! PENDING ─► navigate ─┬─► settle ─► og:image ─┬─► found ─► extract ─► COLLECTED
//!                      │                       └─► missing ─────────► SKIPPED
//!                      └─► failed / timed out ──────────────────────► SKIPPED
//! ```
//!
//! # Concurrency
//!
//! Up to `pool_size` entries are in flight at once. Each entry owns its page
//! context and runs under its own deadline; when the deadline passes only
//! that entry's future is dropped, together with its page. Results are
//! gathered in feed order, whatever order the pages finish loading in.
//!
//! There are no retries: an entry gets exactly one navigation attempt.

use crate::browser::{Browser, BrowserError, PageContext, WaitUntil};
use crate::extract::{article_text, extract_date, find_image_url, press_name};
use crate::models::{Article, FeedEntry, ImageUrl};
use crate::utils::{Clock, truncate_for_log};
use futures::stream::{self, StreamExt};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Default time allowed for the DOM reads after the settle delay.
pub const EXTRACTION_GRACE: Duration = Duration::from_secs(10);

/// Knobs for one collection pass.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Per-entry navigation timeout.
    pub navigation_timeout: Duration,
    /// Wait after the page load before reading it.
    pub settle_delay: Duration,
    /// Maximum characters kept from the article body.
    pub content_limit: usize,
    /// Maximum number of entries processed at the same time.
    pub pool_size: usize,
    /// Time allowed for the DOM reads, usually [`EXTRACTION_GRACE`].
    pub extraction_grace: Duration,
}

impl CollectOptions {
    /// Deadline for a whole entry: navigation, settle delay and extraction.
    ///
    /// An entry still running at its deadline is dropped together with its
    /// page context and reported as [`SkipReason::TimedOut`].
    pub fn entry_deadline(&self) -> Duration {
        self.navigation_timeout + self.settle_delay + self.extraction_grace
    }
}

/// Why an entry did not become an article.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    /// No page context could be opened for the entry.
    #[error("no page context: {0}")]
    PageUnavailable(BrowserError),
    /// The navigation failed (network, HTTP status, engine timeout).
    #[error("navigation failed: {0}")]
    Navigation(BrowserError),
    /// The entry did not finish within its deadline.
    #[error("entry exceeded its {0:?} deadline")]
    TimedOut(Duration),
    /// The page has no usable `og:image`.
    #[error("page has no representative image")]
    MissingImage,
}

impl SkipReason {
    /// A short, stable label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            SkipReason::PageUnavailable(_) => "page_unavailable",
            SkipReason::Navigation(e) if e.kind() == "timeout" => "navigation_timeout",
            SkipReason::Navigation(_) => "navigation",
            SkipReason::TimedOut(_) => "deadline",
            SkipReason::MissingImage => "missing_image",
        }
    }
}

/// The terminal state of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// The entry passed the image gate and became an article.
    Collected(Article),
    /// The entry was dropped; the reason is logged, never raised.
    Skipped(SkipReason),
}

impl EntryOutcome {
    /// The collected article, or `None` for a skipped entry.
    pub fn article(self) -> Option<Article> {
        match self {
            EntryOutcome::Collected(article) => Some(article),
            EntryOutcome::Skipped(_) => None,
        }
    }
}

/// Collect the articles of `entries`, in feed order.
///
/// Skipped entries are logged and left out; nothing here aborts the pass.
///
/// # Arguments
///
/// * `entries` - Feed entries, in feed order
/// * `browser` - The page engine handing out one page context per entry
/// * `options` - Timeouts, settle delay, content limit and pool size
/// * `clock` - Dates entries that carry no publish time
///
/// # Returns
///
/// The collected articles; never longer than `entries`.
pub async fn collect<B: Browser>(
    entries: &[FeedEntry],
    browser: &B,
    options: &CollectOptions,
    clock: &dyn Clock,
) -> Vec<Article> {
    collect_outcomes(entries, browser, options, clock)
        .await
        .into_iter()
        .filter_map(EntryOutcome::article)
        .collect()
}

/// Process every entry and return one outcome per entry, in feed order.
#[instrument(
    level = "info",
    skip_all,
    fields(total = entries.len(), pool_size = options.pool_size)
)]
pub async fn collect_outcomes<B: Browser>(
    entries: &[FeedEntry],
    browser: &B,
    options: &CollectOptions,
    clock: &dyn Clock,
) -> Vec<EntryOutcome> {
    let total = entries.len();
    let deadline = options.entry_deadline();

    let outcomes: Vec<EntryOutcome> = stream::iter(entries.iter().enumerate())
        .map(|(i, entry)| async move {
            let index = i + 1;
            info!(
                index,
                total,
                title = %truncate_for_log(&entry.title, 20),
                "Processing entry"
            );

            let work = process_entry(entry, browser, options, clock);
            let outcome = match tokio::time::timeout(deadline, work).await {
                Ok(outcome) => outcome,
                Err(_) => EntryOutcome::Skipped(SkipReason::TimedOut(deadline)),
            };

            match &outcome {
                EntryOutcome::Collected(article) => {
                    debug!(index, url = %entry.link, press = %article.press, "Collected article");
                }
                EntryOutcome::Skipped(reason) => {
                    warn!(
                        index,
                        url = %entry.link,
                        kind = reason.kind(),
                        reason = %reason,
                        "Skipped entry"
                    );
                }
            }
            outcome
        })
        .buffered(options.pool_size.max(1))
        .collect()
        .await;

    let collected = outcomes
        .iter()
        .filter(|o| matches!(o, EntryOutcome::Collected(_)))
        .count();
    info!(
        total,
        collected,
        skipped = total - collected,
        "Completed article collection"
    );

    outcomes
}

/// Run one entry through its page context.
async fn process_entry<B: Browser>(
    entry: &FeedEntry,
    browser: &B,
    options: &CollectOptions,
    clock: &dyn Clock,
) -> EntryOutcome {
    let mut page = match browser.new_page().await {
        Ok(page) => page,
        Err(e) => return EntryOutcome::Skipped(SkipReason::PageUnavailable(e)),
    };

    if let Err(e) = page
        .navigate(&entry.link, options.navigation_timeout, WaitUntil::DomContentLoaded)
        .await
    {
        return EntryOutcome::Skipped(SkipReason::Navigation(e));
    }

    if !options.settle_delay.is_zero() {
        tokio::time::sleep(options.settle_delay).await;
    }

    // The image gate: no image, no article.
    let Some(image_url) = ImageUrl::parse(&find_image_url(&page).await) else {
        return EntryOutcome::Skipped(SkipReason::MissingImage);
    };

    EntryOutcome::Collected(Article {
        title: entry.title.clone(),
        link: entry.link.clone(),
        date: extract_date(entry, clock),
        press: press_name(&entry.link),
        content: article_text(&page, options.content_limit).await,
        image_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fixture::FixtureBrowser;
    use crate::utils::FixedClock;
    use chrono::{NaiveDate, TimeZone, Utc};

    const BODY: &str =
        "연합뉴스 기자가 전한 오늘의 주요 소식은 다음과 같으며 자세한 내용은 본문에서 확인할 수 있습니다.";

    fn article_page(image: &str) -> String {
        format!(
            r#"<html><head><meta property="og:image" content="{image}"></head>
            <body><nav>홈 정치 경제 사회 세계 스포츠 연예 오피니언 전체메뉴 보기</nav>
            <p>{BODY}</p>
            <footer>Copyright 연합뉴스. All rights reserved. 무단 전재 금지</footer>
            </body></html>"#
        )
    }

    fn entry(n: usize) -> FeedEntry {
        FeedEntry {
            title: format!("기사 {n}"),
            link: format!("https://www.press{n}.co.kr/article/{n}"),
            published: Some(Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap()),
        }
    }

    fn clock() -> FixedClock {
        FixedClock(NaiveDate::from_ymd_opt(2025, 5, 6).unwrap())
    }

    fn options() -> CollectOptions {
        CollectOptions {
            navigation_timeout: Duration::from_secs(2),
            settle_delay: Duration::ZERO,
            content_limit: 200,
            pool_size: 4,
            extraction_grace: EXTRACTION_GRACE,
        }
    }

    fn browser_for(entries: &[FeedEntry]) -> FixtureBrowser {
        entries
            .iter()
            .enumerate()
            .fold(FixtureBrowser::new(), |browser, (i, e)| {
                let image = format!("https://img.example.com/{i}.jpg");
                browser.page(&e.link, &article_page(&image))
            })
    }

    #[tokio::test]
    async fn test_collects_full_article() {
        let entries = vec![entry(1)];
        let browser = browser_for(&entries);

        let articles = collect(&entries, &browser, &options(), &clock()).await;

        assert_eq!(
            articles,
            vec![Article {
                title: "기사 1".to_string(),
                link: "https://www.press1.co.kr/article/1".to_string(),
                date: "20240315".to_string(),
                press: "press1".to_string(),
                content: BODY.to_string(),
                image_url: ImageUrl::parse("https://img.example.com/0.jpg").unwrap(),
            }]
        );
    }

    #[tokio::test]
    async fn test_image_gate() {
        let entries = vec![entry(1), entry(2), entry(3), entry(4)];
        let browser = FixtureBrowser::new()
            .page(&entries[0].link, &article_page("https://img.example.com/a.jpg"))
            .page(&entries[1].link, &article_page(""))
            .page(&entries[2].link, &article_page("   "))
            .page(&entries[3].link, "<html><body><p>no meta at all</p></body></html>");

        let outcomes = collect_outcomes(&entries, &browser, &options(), &clock()).await;

        assert!(matches!(outcomes[0], EntryOutcome::Collected(_)));
        for outcome in &outcomes[1..] {
            assert_eq!(*outcome, EntryOutcome::Skipped(SkipReason::MissingImage));
        }
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let entries = vec![entry(1), entry(2), entry(3)];
        let browser = FixtureBrowser::new()
            .page(&entries[0].link, &article_page("https://img.example.com/a.jpg"))
            .failing(
                &entries[1].link,
                BrowserError::Status {
                    url: entries[1].link.clone(),
                    status: 500,
                },
            )
            .page(&entries[2].link, &article_page("https://img.example.com/c.jpg"));

        let outcomes = collect_outcomes(&entries, &browser, &options(), &clock()).await;

        assert_eq!(outcomes.len(), 3);
        assert!(matches!(outcomes[0], EntryOutcome::Collected(_)));
        assert!(matches!(
            &outcomes[1],
            EntryOutcome::Skipped(SkipReason::Navigation(BrowserError::Status {
                status: 500,
                ..
            }))
        ));
        assert!(matches!(outcomes[2], EntryOutcome::Collected(_)));
        // One attempt per entry, no retries.
        assert_eq!(browser.navigations(), 3);
    }

    #[tokio::test]
    async fn test_navigation_timeout_skips_only_that_entry() {
        let entries = vec![entry(1), entry(2), entry(3)];
        let browser = FixtureBrowser::new()
            .page(&entries[0].link, &article_page("https://img.example.com/a.jpg"))
            .slow_page(
                &entries[1].link,
                &article_page("https://img.example.com/b.jpg"),
                Duration::from_secs(30),
            )
            .page(&entries[2].link, &article_page("https://img.example.com/c.jpg"));
        let options = CollectOptions {
            navigation_timeout: Duration::from_millis(100),
            ..options()
        };

        let outcomes = collect_outcomes(&entries, &browser, &options, &clock()).await;

        assert_eq!(outcomes[1].clone().article(), None);
        assert_eq!(
            match &outcomes[1] {
                EntryOutcome::Skipped(reason) => reason.kind(),
                EntryOutcome::Collected(_) => "collected",
            },
            "navigation_timeout"
        );
        let links: Vec<String> = outcomes
            .into_iter()
            .filter_map(EntryOutcome::article)
            .map(|a| a.link)
            .collect();
        assert_eq!(links, vec![entries[0].link.clone(), entries[2].link.clone()]);
        assert_eq!(browser.open_pages(), 0);
    }

    #[tokio::test]
    async fn test_entry_deadline_drops_only_the_stalled_entry() {
        let entries = vec![entry(1), entry(2), entry(3)];
        let browser = FixtureBrowser::new()
            .page(&entries[0].link, &article_page("https://img.example.com/a.jpg"))
            .stalled_page(
                &entries[1].link,
                &article_page("https://img.example.com/b.jpg"),
                Duration::from_secs(30),
            )
            .page(&entries[2].link, &article_page("https://img.example.com/c.jpg"));
        let options = CollectOptions {
            navigation_timeout: Duration::from_millis(100),
            extraction_grace: Duration::from_millis(200),
            ..options()
        };

        let started = std::time::Instant::now();
        let outcomes = collect_outcomes(&entries, &browser, &options, &clock()).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(
            outcomes[1],
            EntryOutcome::Skipped(SkipReason::TimedOut(options.entry_deadline()))
        );
        assert_eq!(
            match &outcomes[1] {
                EntryOutcome::Skipped(reason) => reason.kind(),
                EntryOutcome::Collected(_) => "collected",
            },
            "deadline"
        );
        let links: Vec<String> = outcomes
            .into_iter()
            .filter_map(EntryOutcome::article)
            .map(|a| a.link)
            .collect();
        assert_eq!(links, vec![entries[0].link.clone(), entries[2].link.clone()]);
        // The dropped entry released its page context.
        assert_eq!(browser.open_pages(), 0);
    }

    #[tokio::test]
    async fn test_preserves_feed_order() {
        let entries: Vec<FeedEntry> = (1..=8).map(entry).collect();
        // Earlier entries load slower, so they finish last.
        let browser = entries
            .iter()
            .enumerate()
            .fold(FixtureBrowser::new(), |browser, (i, e)| {
                browser.slow_page(
                    &e.link,
                    &article_page(&format!("https://img.example.com/{i}.jpg")),
                    Duration::from_millis(20 * (8 - i as u64)),
                )
            });

        let articles = collect(&entries, &browser, &options(), &clock()).await;

        let links: Vec<&str> = articles.iter().map(|a| a.link.as_str()).collect();
        let expected: Vec<&str> = entries.iter().map(|e| e.link.as_str()).collect();
        assert_eq!(links, expected);
    }

    #[tokio::test]
    async fn test_pool_size_bounds_open_pages() {
        let entries: Vec<FeedEntry> = (1..=10).map(entry).collect();
        let browser = entries.iter().fold(FixtureBrowser::new(), |browser, e| {
            browser.slow_page(
                &e.link,
                &article_page("https://img.example.com/a.jpg"),
                Duration::from_millis(30),
            )
        });
        let options = CollectOptions {
            pool_size: 3,
            ..options()
        };

        let articles = collect(&entries, &browser, &options, &clock()).await;

        assert_eq!(articles.len(), 10);
        assert!(browser.peak_open_pages() <= 3);
        assert_eq!(browser.open_pages(), 0);
    }

    #[tokio::test]
    async fn test_content_is_bounded() {
        let entries = vec![entry(1)];
        let long_body = "긴 본문 문장이 계속 이어집니다 그리고 또 이어집니다 ".repeat(30);
        let page = format!(
            r#"<meta property="og:image" content="https://img.example.com/a.jpg">
            <p>{long_body}</p>"#
        );
        let browser = FixtureBrowser::new().page(&entries[0].link, &page);
        let options = CollectOptions {
            content_limit: 50,
            ..options()
        };

        let articles = collect(&entries, &browser, &options, &clock()).await;

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].content.chars().count(), 50);
    }

    #[tokio::test]
    async fn test_missing_publish_time_uses_clock() {
        let mut undated = entry(1);
        undated.published = None;
        let entries = vec![undated];
        let browser = browser_for(&entries);

        let articles = collect(&entries, &browser, &options(), &clock()).await;

        assert_eq!(articles[0].date, "20250506");
    }

    #[tokio::test]
    async fn test_collection_is_idempotent() {
        let entries: Vec<FeedEntry> = (1..=5).map(entry).collect();
        let browser = browser_for(&entries);

        let first = collect(&entries, &browser, &options(), &clock()).await;
        let second = collect(&entries, &browser, &options(), &clock()).await;

        assert_eq!(first.len(), 5);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_output_never_exceeds_input() {
        let entries: Vec<FeedEntry> = (1..=6).map(entry).collect();
        let browser = entries
            .iter()
            .enumerate()
            .fold(FixtureBrowser::new(), |browser, (i, e)| {
                let image = if i % 2 == 0 { "https://img.example.com/a.jpg" } else { "" };
                browser.page(&e.link, &article_page(image))
            });

        let articles = collect(&entries, &browser, &options(), &clock()).await;

        assert_eq!(articles.len(), 3);
        for article in &articles {
            assert!(article.image_url.as_str().starts_with("http"));
            assert!(article.content.chars().count() <= 200);
        }
    }

    #[tokio::test]
    async fn test_empty_feed() {
        let browser = FixtureBrowser::new();
        let articles = collect(&[], &browser, &options(), &clock()).await;
        assert!(articles.is_empty());
    }
}
