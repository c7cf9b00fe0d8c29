//! Census population API client.
//!
//! Provides a client for the keyed census population endpoint, which
//! answers a `get`/`for` query with a JSON array-of-arrays: a header row
//! followed by one data row per region.
//!
//! ### Specification
//!
//! - **Endpoint**: one fixed base URL (year/program baked into the path).
//! - **Authentication**: `key` query parameter.
//! - **Normalization**: header cells are lowercased; `null` cells become
//!   `None`; bare numbers are stringified and coerced later at insert.
//! - **Fault tolerance**: one silent retry, then the failure propagates.

pub mod error;
pub mod request;

pub use error::CensusError;
pub use request::CensusRequest;

use casetrack_core::catalog::{Dataset, TableData};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Default base URL for the census population API.
const DEFAULT_BASE_URL: &str = "https://api.census.gov/data/2019/pep/population";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "casetrack/0.1";

/// Census API client configuration.
#[derive(Debug, Clone)]
pub struct CensusConfig {
    /// API key passed as the `key` query parameter.
    pub api_key: String,
    /// Base URL (default: the 2019 population estimates endpoint).
    pub base_url: String,
    /// Request timeout (default: 20s).
    pub timeout: Duration,
    /// User-agent string (default: casetrack/0.x).
    pub user_agent: String,
}

impl Default for CensusConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CensusConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads CASETRACK_CENSUS_API_KEY from environment. Returns error if not set.
    pub fn from_env() -> Result<Self, CensusError> {
        let api_key = std::env::var("CASETRACK_CENSUS_API_KEY").map_err(|_| CensusError::MissingApiKey)?;

        Ok(Self { api_key, ..Default::default() })
    }
}

/// Census population API client.
#[derive(Debug, Clone)]
pub struct CensusClient {
    http: reqwest::Client,
    config: CensusConfig,
}

impl CensusClient {
    /// Create a new census client with the given configuration.
    pub fn new(config: CensusConfig) -> Result<Self, CensusError> {
        if config.api_key.is_empty() {
            return Err(CensusError::MissingApiKey);
        }

        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| CensusError::Network(Arc::new(e)))?;

        Ok(Self { http, config })
    }

    /// Create a new census client from environment variables.
    pub fn from_env() -> Result<Self, CensusError> {
        Self::new(CensusConfig::from_env()?)
    }

    /// Fetch population figures for one census dataset.
    ///
    /// Performs the single automatic retry before giving up.
    pub async fn fetch_population(&self, dataset: Dataset) -> Result<TableData, CensusError> {
        let request = CensusRequest::for_dataset(dataset)?;

        let payload = match self.get_payload(&request).await {
            Ok(payload) => payload,
            Err(first) => {
                tracing::warn!(dataset = %dataset, error = %first, "census fetch failed, retrying once");
                self.get_payload(&request).await?
            }
        };

        let data = parse_payload(&payload)?;
        tracing::debug!(dataset = %dataset, rows = data.rows.len(), "census payload parsed");
        Ok(data)
    }

    async fn get_payload(&self, request: &CensusRequest) -> Result<Vec<u8>, CensusError> {
        let response = self
            .http
            .get(&self.config.base_url)
            .header("Accept", "application/json")
            .query(request)
            .query(&[("key", &self.config.api_key)])
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("census API response status: {}", status);

        if status == 401 || status == 403 {
            return Err(CensusError::AuthError);
        }

        if status == 429 {
            return Err(CensusError::RateLimited);
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(CensusError::HttpError { status: status.as_u16() });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Parse the array-of-arrays payload into header + rows.
fn parse_payload(bytes: &[u8]) -> Result<TableData, CensusError> {
    let raw: Vec<Vec<Value>> = serde_json::from_slice(bytes).map_err(|e| CensusError::Parse(e.to_string()))?;

    let mut rows_iter = raw.into_iter();
    let header_row = rows_iter.next().ok_or_else(|| CensusError::Parse("empty response".into()))?;

    let header = header_row
        .into_iter()
        .map(|cell| match cell {
            Value::String(s) => Ok(s.to_ascii_lowercase()),
            other => Err(CensusError::Parse(format!("non-string header cell: {other}"))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let rows = rows_iter
        .map(|row| row.into_iter().map(cell_to_text).collect::<Result<Vec<_>, _>>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TableData { header, rows })
}

fn cell_to_text(cell: Value) -> Result<Option<String>, CensusError> {
    match cell {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(CensusError::Parse(format!("unexpected cell: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env_missing_key() {
        let original = std::env::var("CASETRACK_CENSUS_API_KEY").ok();
        unsafe {
            std::env::remove_var("CASETRACK_CENSUS_API_KEY");
        }

        let result = CensusConfig::from_env();
        assert!(matches!(result, Err(CensusError::MissingApiKey)));

        if let Some(key) = original {
            unsafe {
                std::env::set_var("CASETRACK_CENSUS_API_KEY", key);
            }
        }
    }

    #[test]
    fn test_client_new_missing_key() {
        let config = CensusConfig::default();
        let result = CensusClient::new(config);
        assert!(matches!(result, Err(CensusError::MissingApiKey)));
    }

    #[test]
    fn test_client_new_with_key() {
        let config = CensusConfig { api_key: "test-key".into(), ..Default::default() };
        assert!(CensusClient::new(config).is_ok());
    }

    #[test]
    fn test_parse_payload() {
        let body = br#"[
            ["POP", "DENSITY", "NAME", "state"],
            ["9986857", "176.7", "Michigan", "26"],
            ["19453561", null, "New York", "36"]
        ]"#;
        let data = parse_payload(body).unwrap();
        assert_eq!(data.header, vec!["pop", "density", "name", "state"]);
        assert_eq!(data.rows.len(), 2);
        assert_eq!(data.rows[0][0], Some("9986857".to_string()));
        assert_eq!(data.rows[1][1], None);
    }

    #[test]
    fn test_parse_payload_numeric_cells_tolerated() {
        let body = br#"[["POP", "us"], [328239523, "1"]]"#;
        let data = parse_payload(body).unwrap();
        assert_eq!(data.rows[0][0], Some("328239523".to_string()));
    }

    #[test]
    fn test_parse_payload_rejects_non_array() {
        let result = parse_payload(br#"{"error": "bad request"}"#);
        assert!(matches!(result, Err(CensusError::Parse(_))));
    }

    #[test]
    fn test_parse_payload_rejects_empty() {
        let result = parse_payload(b"[]");
        assert!(matches!(result, Err(CensusError::Parse(_))));
    }

    #[test]
    fn test_parse_payload_rejects_nested_cell() {
        let result = parse_payload(br#"[["POP"], [["nested"]]]"#);
        assert!(matches!(result, Err(CensusError::Parse(_))));
    }
}
