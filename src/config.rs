//! Runtime settings.
//!
//! Settings are resolved in three layers, lowest precedence first:
//!
//! 1. Built-in defaults ([`Settings::default`])
//! 2. The YAML file passed with `--config`
//! 3. Command-line flags and their environment variables
//!
//! # File Format
//!
//! Every key is optional:
//!
//! ```yaml
//! feed_url: "https://news.google.com/rss?hl=ko&gl=KR&ceid=KR:ko"
//! max_articles: 30
//! navigation_timeout_secs: 60
//! settle_delay_ms: 2000
//! content_limit: 200
//! pool_size: 4
//! ```

use crate::cli::Cli;
use crate::extract::DEFAULT_CONTENT_LIMIT;
use crate::feed::DEFAULT_MAX_ARTICLES;
use crate::weather::default_weather_url;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

/// Google News "headlines" topic, Korean edition.
///
/// Its entry links reach the publisher through a script-driven redirect, so
/// engines that do not run scripts may land on Google's interstitial page.
pub const DEFAULT_FEED_URL: &str = concat!(
    "https://news.google.com/rss/topics/",
    "CAAqKggKIiRDQkFTRlFvSUwyMHZNRGRqTVhZU0JXVnVMVWRDR2dKSlRpZ0FQAQ",
    "?hl=ko&gl=KR&ceid=KR:ko"
);

/// Sent with every request unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("news_briefing/", env!("CARGO_PKG_VERSION"));

/// Errors raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The settings file is not valid YAML for [`Settings`].
    #[error("invalid settings in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    /// A value is out of range.
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub feed_url: String,
    pub max_articles: usize,
    pub feed_timeout_secs: u64,
    pub navigation_timeout_secs: u64,
    /// Wait after each page load so late-rendered content can appear. A
    /// heuristic, not a readiness guarantee.
    pub settle_delay_ms: u64,
    pub content_limit: usize,
    pub pool_size: usize,
    pub weather_url: String,
    pub weather_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            max_articles: DEFAULT_MAX_ARTICLES,
            feed_timeout_secs: 30,
            navigation_timeout_secs: 60,
            settle_delay_ms: 2000,
            content_limit: DEFAULT_CONTENT_LIMIT,
            pool_size: 4,
            weather_url: default_weather_url(),
            weather_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Settings {
    /// Resolve settings from the optional file named by `cli` and its flags.
    ///
    /// # Arguments
    ///
    /// * `cli` - Parsed command line; `cli.config` names the optional file
    ///
    /// # Returns
    ///
    /// Validated settings, or a [`ConfigError`] naming the file or the value
    /// at fault.
    #[instrument(level = "info", skip_all)]
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut settings = match &cli.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.clone(),
                    source,
                })?;
                let settings = Self::from_yaml(&raw).map_err(|source| ConfigError::Yaml {
                    path: path.clone(),
                    source,
                })?;
                info!(%path, "Loaded settings file");
                settings
            }
            None => Self::default(),
        };

        settings.apply_overrides(cli);
        settings.validate()?;
        Ok(settings)
    }

    /// Parse a YAML document; missing keys keep their defaults.
    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(feed_url) = &cli.feed_url {
            self.feed_url = feed_url.clone();
        }
        if let Some(max_articles) = cli.max_articles {
            self.max_articles = max_articles;
        }
        if let Some(secs) = cli.navigation_timeout_secs {
            self.navigation_timeout_secs = secs;
        }
        if let Some(ms) = cli.settle_delay_ms {
            self.settle_delay_ms = ms;
        }
        if let Some(limit) = cli.content_limit {
            self.content_limit = limit;
        }
        if let Some(pool_size) = cli.pool_size {
            self.pool_size = pool_size;
        }
        if let Some(weather_url) = &cli.weather_url {
            self.weather_url = weather_url.clone();
        }
        if let Some(user_agent) = &cli.user_agent {
            self.user_agent = user_agent.clone();
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 {
            return Err(ConfigError::Invalid("pool_size must be at least 1".to_string()));
        }
        if self.content_limit == 0 {
            return Err(ConfigError::Invalid("content_limit must be at least 1".to_string()));
        }
        if self.max_articles == 0 {
            return Err(ConfigError::Invalid("max_articles must be at least 1".to_string()));
        }
        if self.navigation_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "navigation_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.weather_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "weather_timeout_secs must be at least 1".to_string(),
            ));
        }
        url::Url::parse(&self.feed_url)
            .map_err(|e| ConfigError::Invalid(format!("feed_url {:?}: {e}", self.feed_url)))?;
        Ok(())
    }

    /// Per-entry navigation timeout.
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    /// Wait between page load and the DOM reads.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Bound on fetching the feed document.
    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }

    /// Navigation timeout of the weather probe.
    pub fn weather_timeout(&self) -> Duration {
        Duration::from_secs(self.weather_timeout_secs)
    }
}
