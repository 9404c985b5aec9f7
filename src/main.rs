//! # News Briefing
//!
//! A scheduled content-aggregation pipeline that reads a news feed, visits
//! each linked article through a page engine, keeps the ones that carry a
//! representative image, and renders them together with a live weather
//! snippet into a single self-refreshing page.
//!
//! ## Usage
//!
//! ```sh
//! news_briefing -o ./site
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Feed**: Read up to `max_articles` entries from the source feed
//! 2. **Collection**: Visit entries through isolated page contexts (`pool_size` at a time),
//!    applying the image gate and extracting date, press and body text
//! 3. **Weather**: Probe the weather page concurrently with the collection
//! 4. **Output**: Write `index.html` and `articles.json`

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

use news_briefing::browser::http::HttpBrowser;
use news_briefing::cli::Cli;
use news_briefing::collector::{self, CollectOptions, EXTRACTION_GRACE};
use news_briefing::config::Settings;
use news_briefing::models::CollectionResult;
use news_briefing::outputs::{html, json};
use news_briefing::utils::{SystemClock, ensure_writable_dir};
use news_briefing::{feed, weather};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_briefing starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let settings = match Settings::load(&args) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Could not load settings");
            return Err(e.into());
        }
    };
    info!(
        feed_url = %settings.feed_url,
        max_articles = settings.max_articles,
        pool_size = settings.pool_size,
        settle_delay_ms = settings.settle_delay_ms,
        "Settings resolved"
    );

    // Early check: ensure output dir is writable
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let browser = HttpBrowser::new(&settings.user_agent)?;
    let clock = SystemClock;
    let options = CollectOptions {
        navigation_timeout: settings.navigation_timeout(),
        settle_delay: settings.settle_delay(),
        content_limit: settings.content_limit,
        pool_size: settings.pool_size,
        extraction_grace: EXTRACTION_GRACE,
    };

    // ---- Feed + collection, with the weather probe alongside ----
    let collection = async {
        let entries = feed::read_feed(
            browser.client(),
            &settings.feed_url,
            settings.max_articles,
            settings.feed_timeout(),
        )
        .await;
        collector::collect(&entries, &browser, &options, &clock).await
    };
    let weather_probe =
        weather::probe_weather(&browser, &settings.weather_url, settings.weather_timeout());

    let (articles, weather) = tokio::join!(collection, weather_probe);

    let result = CollectionResult {
        generated_at: Local::now(),
        articles,
        weather,
    };
    info!(
        articles = result.articles.len(),
        weather_available = !result.weather.is_unavailable(),
        "Collection finished"
    );

    // ---- Outputs ----
    if let Err(e) = json::write_collection(&result, &args.output_dir).await {
        error!(error = %e, "Failed to write JSON snapshot");
    }

    if let Err(e) = html::write_report(&result, &args.output_dir).await {
        error!(error = %e, "Failed to write briefing page");
        return Err(e);
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
