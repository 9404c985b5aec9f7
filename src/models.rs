//! Data models for feed entries, published articles and the weather snippet.
//!
//! This module defines the core data structures used throughout the application:
//! - [`FeedEntry`]: A candidate item read from the source feed
//! - [`ImageUrl`]: A representative image URL that already passed the image gate
//! - [`Article`]: A publication-eligible record built from an entry and its page
//! - [`WeatherReading`]: The live weather snippet shown next to the articles
//! - [`CollectionResult`]: Everything one run hands to the outputs

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Temperature shown when the weather probe could not read the page.
pub const WEATHER_TEMP_UNAVAILABLE: &str = "N/A";
/// Status shown when the weather probe could not read the page.
pub const WEATHER_STATUS_UNAVAILABLE: &str = "unavailable";

/// A candidate entry read from the source feed, before enrichment.
///
/// Entries keep the feed's natural order. Duplicate links coming from the
/// upstream feed are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    /// The entry headline.
    pub title: String,
    /// The article link the page engine navigates to.
    pub link: String,
    /// The structured publish time, when the feed carries one.
    pub published: Option<DateTime<Utc>>,
}

/// An image URL that passed the image gate: non-empty and absolute.
///
/// The only way to obtain one is [`ImageUrl::parse`], which makes an
/// [`Article`] without an image unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageUrl(String);

impl ImageUrl {
    /// Accept `raw` if it is non-blank and starts with an `http` scheme.
    ///
    /// # Returns
    ///
    /// `None` for an empty, blank or relative value.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() || !raw.starts_with("http") {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    /// The URL as accepted.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ImageUrl {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ImageUrl::parse(&value).ok_or_else(|| format!("not an absolute image url: {value:?}"))
    }
}

impl From<ImageUrl> for String {
    fn from(value: ImageUrl) -> Self {
        value.0
    }
}

/// A fully enriched, publication-eligible article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// The entry headline.
    pub title: String,
    /// The original article link.
    pub link: String,
    /// The publication date in `YYYYMMDD` format.
    pub date: String,
    /// The press name derived from the link's host (e.g. `yonhapnews`).
    pub press: String,
    /// A bounded-length text summary of the page body.
    pub content: String,
    /// The representative image of the page.
    pub image_url: ImageUrl,
}

/// The live weather snippet.
///
/// Always constructible: a failed probe produces [`WeatherReading::unavailable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// The current temperature as displayed by the weather page (e.g. `3.2°`).
    pub temp: String,
    /// A short description of the conditions (e.g. `맑음`).
    pub status: String,
}

impl WeatherReading {
    /// The sentinel reading used whenever the probe fails.
    pub fn unavailable() -> Self {
        Self {
            temp: WEATHER_TEMP_UNAVAILABLE.to_string(),
            status: WEATHER_STATUS_UNAVAILABLE.to_string(),
        }
    }

    /// Whether this is the sentinel produced by a failed probe.
    pub fn is_unavailable(&self) -> bool {
        self.temp == WEATHER_TEMP_UNAVAILABLE && self.status == WEATHER_STATUS_UNAVAILABLE
    }
}

/// The artifact handed to the outputs at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionResult {
    /// When the collection finished.
    pub generated_at: DateTime<Local>,
    /// Collected articles, in feed order.
    pub articles: Vec<Article>,
    /// The weather snippet for the sidebar.
    pub weather: WeatherReading,
}
