//! Weather probe.
//!
//! Reads the current temperature and a short condition label from a weather
//! search-results page. The probe is best-effort: any failure yields
//! [`WeatherReading::unavailable`] and never reaches the caller as an error.

use crate::browser::{Browser, BrowserError, PageContext, WaitUntil};
use crate::models::WeatherReading;
use std::time::Duration;
use tracing::{info, instrument, warn};

const WEATHER_SEARCH_URL: &str = "https://search.naver.com/search.naver";
const WEATHER_QUERY: &str = "날씨";

const TEMPERATURE_SELECTOR: &str = ".temperature_text strong";
const STATUS_SELECTOR: &str = ".before_slash";

/// Screen-reader label rendered inside the temperature element.
const TEMPERATURE_LABEL: &str = "현재 온도";

/// Extra time allowed for the DOM reads once navigation has finished.
const READ_GRACE: Duration = Duration::from_secs(5);

/// The weather search page used when none is configured.
pub fn default_weather_url() -> String {
    format!(
        "{}?query={}",
        WEATHER_SEARCH_URL,
        urlencoding::encode(WEATHER_QUERY)
    )
}

/// Open a dedicated page context on `browser` and probe the weather.
///
/// # Arguments
///
/// * `browser` - The page engine; the probe uses its own page context
/// * `url` - The weather search-results page
/// * `timeout` - Navigation timeout; see [`fetch_weather`] for the outer bound
///
/// # Returns
///
/// The reading, or [`WeatherReading::unavailable`] on any failure.
#[instrument(level = "info", skip(browser, timeout))]
pub async fn probe_weather<B: Browser>(
    browser: &B,
    url: &str,
    timeout: Duration,
) -> WeatherReading {
    match browser.new_page().await {
        Ok(mut page) => fetch_weather(&mut page, url, timeout).await,
        Err(e) => {
            warn!(error = %e, kind = e.kind(), "Could not open page for weather probe");
            WeatherReading::unavailable()
        }
    }
}

/// Navigate `page` to the weather page and read the snippet.
///
/// The navigation waits for network idle and is bounded by `timeout`; the
/// whole probe is additionally bounded by `timeout` plus a 5 second read
/// grace, so a stalled read cannot hold up the run.
pub async fn fetch_weather<P: PageContext>(
    page: &mut P,
    url: &str,
    timeout: Duration,
) -> WeatherReading {
    let probe = read_weather(page, url, timeout);
    match tokio::time::timeout(timeout + READ_GRACE, probe).await {
        Ok(Ok(reading)) => {
            info!(temp = %reading.temp, status = %reading.status, "Read weather");
            reading
        }
        Ok(Err(e)) => {
            warn!(error = %e, kind = e.kind(), "Weather probe failed; using placeholder");
            WeatherReading::unavailable()
        }
        Err(_) => {
            warn!(?timeout, "Weather probe timed out; using placeholder");
            WeatherReading::unavailable()
        }
    }
}

async fn read_weather<P: PageContext>(
    page: &mut P,
    url: &str,
    timeout: Duration,
) -> Result<WeatherReading, BrowserError> {
    page.navigate(url, timeout, WaitUntil::NetworkIdle).await?;

    let temp = page
        .read_text(TEMPERATURE_SELECTOR)
        .await?
        .replace(TEMPERATURE_LABEL, "")
        .trim()
        .to_string();
    let status = page.read_text(STATUS_SELECTOR).await?.trim().to_string();

    // An element with no text is as useless as a missing one.
    if temp.is_empty() {
        return Err(BrowserError::NotFound {
            selector: TEMPERATURE_SELECTOR.to_string(),
        });
    }
    if status.is_empty() {
        return Err(BrowserError::NotFound {
            selector: STATUS_SELECTOR.to_string(),
        });
    }

    Ok(WeatherReading { temp, status })
}
