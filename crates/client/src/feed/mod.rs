//! Time-series feed client.
//!
//! Fetches the flat CSV case/death feeds (one row per region per date,
//! one file per geography) and parses them into [`TableData`]. The feeds
//! are plain unquoted CSV, so parsing is a line/comma split with
//! header-width validation per row.
//!
//! Transient fault tolerance is exactly one silent retry: the first
//! failure is logged at `warn` and the request repeated once, then the
//! second failure propagates.

pub mod error;

pub use error::FeedError;

use casetrack_core::catalog::{Dataset, TableData};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Configuration for the feed client.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Base URL the per-geography CSV files hang off.
    pub base_url: String,

    /// User agent string (default: "casetrack/0.1").
    pub user_agent: String,

    /// Request timeout (default: 20s).
    pub timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://raw.githubusercontent.com/nytimes/covid-19-data/master/".to_string(),
            user_agent: "casetrack/0.1".to_string(),
            timeout: Duration::from_millis(20_000),
        }
    }
}

/// HTTP client for the time-series feeds.
pub struct FeedClient {
    http: Client,
    config: FeedConfig,
}

impl FeedClient {
    /// Create a new feed client with the given configuration.
    pub fn new(config: FeedConfig) -> Result<Self, FeedError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| FeedError::Network(Arc::new(e)))?;

        Ok(Self { http, config })
    }

    /// CSV file backing a time-series dataset.
    fn file_for(dataset: Dataset) -> Result<&'static str, FeedError> {
        match dataset {
            Dataset::Us => Ok("us.csv"),
            Dataset::State => Ok("us-states.csv"),
            Dataset::County => Ok("us-counties.csv"),
            other => Err(FeedError::NotAFeedDataset(other.to_string())),
        }
    }

    /// Fetch and parse one time-series dataset.
    ///
    /// Performs the single automatic retry before giving up.
    pub async fn fetch_series(&self, dataset: Dataset) -> Result<TableData, FeedError> {
        let file = Self::file_for(dataset)?;
        let base = Url::parse(&self.config.base_url).map_err(|e| FeedError::InvalidUrl(e.to_string()))?;
        let url = base.join(file).map_err(|e| FeedError::InvalidUrl(e.to_string()))?;

        let text = match self.get_text(&url).await {
            Ok(text) => text,
            Err(first) => {
                tracing::warn!(url = %url, error = %first, "feed fetch failed, retrying once");
                self.get_text(&url).await?
            }
        };

        tracing::debug!(dataset = %dataset, bytes = text.len(), "feed fetched");
        parse_feed(&text)
    }

    async fn get_text(&self, url: &Url) -> Result<String, FeedError> {
        let response = self.http.get(url.as_str()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::HttpError { status: status.as_u16() });
        }
        Ok(response.text().await?)
    }
}

/// Parse a CSV feed body: header line, then one row per line.
///
/// Rows whose width disagrees with the header fail the whole parse;
/// trailing blank lines are skipped.
pub fn parse_feed(text: &str) -> Result<TableData, FeedError> {
    let mut lines = text.lines();
    let header_line = lines.next().ok_or_else(|| FeedError::Parse("feed is empty".into()))?;
    let header: Vec<String> = header_line
        .trim_end_matches('\r')
        .split(',')
        .map(|s| s.to_string())
        .collect();

    let mut rows = Vec::new();
    for (number, line) in lines.enumerate() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let cells: Vec<Option<String>> = line.split(',').map(|s| Some(s.to_string())).collect();
        if cells.len() != header.len() {
            return Err(FeedError::Parse(format!(
                "line {}: {} fields, expected {}",
                number + 2,
                cells.len(),
                header.len()
            )));
        }
        rows.push(cells);
    }

    Ok(TableData { header, rows })
}
