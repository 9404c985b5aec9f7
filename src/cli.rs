//! Command-line interface definitions for News Briefing.
//!
//! Every tunable of the pipeline can come from a flag, an environment
//! variable or the optional YAML settings file (see [`crate::config`]).
//! Flags and environment variables win over the file.

use clap::Parser;

/// Command-line arguments for the News Briefing application.
///
/// # Examples
///
/// ```sh
/// # Defaults, writing index.html and articles.json to ./site
/// news_briefing -o ./site
///
/// # With a settings file and a wider worker pool
/// news_briefing -o ./site --config briefing.yaml --pool-size 8
///
/// # Skip the settle delay
/// NEWS_BRIEFING_SETTLE_DELAY_MS=0 news_briefing -o ./site
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output directory for index.html and articles.json
    #[arg(short, long, env = "NEWS_BRIEFING_OUTPUT_DIR", default_value = ".")]
    pub output_dir: String,

    /// Optional path to a YAML settings file
    #[arg(short, long, env = "NEWS_BRIEFING_CONFIG")]
    pub config: Option<String>,

    /// Feed (RSS or Atom) to read entries from
    #[arg(long, env = "NEWS_BRIEFING_FEED_URL")]
    pub feed_url: Option<String>,

    /// Maximum number of feed entries to visit
    #[arg(long, env = "NEWS_BRIEFING_MAX_ARTICLES")]
    pub max_articles: Option<usize>,

    /// Per-article navigation timeout, in seconds
    #[arg(long, env = "NEWS_BRIEFING_NAVIGATION_TIMEOUT_SECS")]
    pub navigation_timeout_secs: Option<u64>,

    /// Wait after each page load before extracting, in milliseconds
    #[arg(long, env = "NEWS_BRIEFING_SETTLE_DELAY_MS")]
    pub settle_delay_ms: Option<u64>,

    /// Maximum number of characters kept from each article body
    #[arg(long, env = "NEWS_BRIEFING_CONTENT_LIMIT")]
    pub content_limit: Option<usize>,

    /// Number of articles fetched concurrently
    #[arg(long, env = "NEWS_BRIEFING_POOL_SIZE")]
    pub pool_size: Option<usize>,

    /// Search-results page the weather snippet is read from
    #[arg(long, env = "NEWS_BRIEFING_WEATHER_URL")]
    pub weather_url: Option<String>,

    /// User agent sent by the page engine
    #[arg(long, env = "NEWS_BRIEFING_USER_AGENT")]
    pub user_agent: Option<String>,
}
