//! Feed client error types.

use std::sync::Arc;

/// Errors from the time-series feed client.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The dataset has no backing CSV file (census family).
    #[error("not a time-series dataset: {0}")]
    NotAFeedDataset(String),

    /// Base URL or file path failed to parse.
    #[error("invalid feed URL: {0}")]
    InvalidUrl(String),

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Feed body could not be parsed as CSV.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { FeedError::Timeout } else { FeedError::Network(Arc::new(err)) }
    }
}

impl From<FeedError> for casetrack_core::Error {
    fn from(err: FeedError) -> Self {
        use casetrack_core::Error;

        match err {
            FeedError::NotAFeedDataset(dataset) => Error::InvalidInput(format!("not a time-series dataset: {dataset}")),
            FeedError::InvalidUrl(msg) => Error::InvalidInput(format!("invalid feed URL: {msg}")),
            FeedError::Timeout => Error::FetchTimeout("time-series feed".into()),
            FeedError::Network(e) => Error::Fetch(e.to_string()),
            FeedError::HttpError { status } => Error::HttpStatus(status),
            FeedError::Parse(msg) => Error::Parse(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FeedError::HttpError { status: 404 };
        assert!(err.to_string().contains("404"));

        let err = FeedError::Parse("line 2".to_string());
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_into_core_error() {
        let err: casetrack_core::Error = FeedError::HttpError { status: 503 }.into();
        assert!(matches!(err, casetrack_core::Error::HttpStatus(503)));

        let err: casetrack_core::Error = FeedError::Timeout.into();
        assert!(matches!(err, casetrack_core::Error::FetchTimeout(_)));
    }
}
