//! Briefing page rendering.
//!
//! Produces a single static `index.html` from `templates/briefing.html`: a
//! header with the run date, one card per article and a weather sidebar
//! stamped with the run time. The page reloads itself every
//! [`REFRESH_INTERVAL_MS`] so a browser left open picks up the next run's
//! file. Every interpolated value is HTML-escaped by the template engine.

use crate::models::{Article, CollectionResult, WeatherReading};
use askama::Template;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// File name of the page inside the output directory.
pub const HTML_FILENAME: &str = "index.html";

/// Reload interval of the page, in milliseconds (10 minutes).
pub const REFRESH_INTERVAL_MS: u64 = 600_000;

/// Template for the briefing page.
#[derive(Template)]
#[template(path = "briefing.html")]
struct BriefingTemplate<'a> {
    /// Run date, `YYYY.MM.DD`.
    today: String,
    /// Run time, `HH:MM`, shown under the weather.
    now_time: String,
    articles: &'a [Article],
    weather: &'a WeatherReading,
    refresh_interval_ms: u64,
}

/// Render the full briefing page for `result`.
///
/// # Arguments
///
/// * `result` - The articles, weather reading and run time of one run
///
/// # Returns
///
/// The complete HTML document, or the template engine's error.
pub fn render_report(result: &CollectionResult) -> Result<String, askama::Error> {
    BriefingTemplate {
        today: result.generated_at.format("%Y.%m.%d").to_string(),
        now_time: result.generated_at.format("%H:%M").to_string(),
        articles: &result.articles,
        weather: &result.weather,
        refresh_interval_ms: REFRESH_INTERVAL_MS,
    }
    .render()
}

/// Render `result` and write it to `{output_dir}/index.html`.
///
/// # Arguments
///
/// * `result` - The collection to publish
/// * `output_dir` - Directory the page is written into
///
/// # Returns
///
/// The path of the written file.
#[instrument(level = "info", skip_all, fields(%output_dir))]
pub async fn write_report(
    result: &CollectionResult,
    output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let html = render_report(result)?;
    let path = Path::new(output_dir).join(HTML_FILENAME);

    fs::write(&path, html).await?;
    info!(path = %path.display(), articles = result.articles.len(), "Wrote briefing page");

    Ok(path)
}
