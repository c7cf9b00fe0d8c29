//! Census API client error types.

use std::sync::Arc;

/// Errors from the census population API client.
#[derive(Debug, thiserror::Error)]
pub enum CensusError {
    /// Missing CASETRACK_CENSUS_API_KEY environment variable.
    #[error("missing API key: CASETRACK_CENSUS_API_KEY not set")]
    MissingApiKey,

    /// The dataset is not served by the census API (time-series family).
    #[error("not a census dataset: {0}")]
    NotACensusDataset(String),

    /// Authentication failed (invalid API key).
    #[error("authentication failed: invalid API key")]
    AuthError,

    /// Rate limited by the census API.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for CensusError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { CensusError::Timeout } else { CensusError::Network(Arc::new(err)) }
    }
}

impl From<CensusError> for casetrack_core::Error {
    fn from(err: CensusError) -> Self {
        use casetrack_core::Error;

        match err {
            CensusError::MissingApiKey => Error::ApiAuth("census API key not configured".into()),
            CensusError::NotACensusDataset(dataset) => {
                Error::InvalidInput(format!("not a census dataset: {dataset}"))
            }
            CensusError::AuthError => Error::ApiAuth("census API rejected the key".into()),
            CensusError::RateLimited => Error::ApiRateLimited("census API".into()),
            CensusError::HttpError { status } => Error::HttpStatus(status),
            CensusError::Timeout => Error::FetchTimeout("census API".into()),
            CensusError::Network(e) => Error::Fetch(e.to_string()),
            CensusError::Parse(msg) => Error::Parse(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CensusError::MissingApiKey;
        assert!(err.to_string().contains("API key"));

        let err = CensusError::HttpError { status: 500 };
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_into_core_error() {
        let err: casetrack_core::Error = CensusError::AuthError.into();
        assert!(matches!(err, casetrack_core::Error::ApiAuth(_)));

        let err: casetrack_core::Error = CensusError::RateLimited.into();
        assert!(matches!(err, casetrack_core::Error::ApiRateLimited(_)));
    }
}
