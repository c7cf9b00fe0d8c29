//! Unified error types for casetrack.
//!
//! Every failure in a refresh pass is fatal and surfaces to the caller;
//! the only tolerated fault is the single silent retry inside the
//! upstream clients.

use tokio_rusqlite::rusqlite;

/// Unified error types for the casetrack data layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., a malformed FIPS code).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Upstream header did not match the dataset's schema policy.
    #[error("SCHEMA_MISMATCH: {dataset}: {detail}")]
    SchemaMismatch { dataset: &'static str, detail: String },

    /// A cell could not be coerced to its declared column type.
    #[error("TYPE_COERCION: column {column} rejected value {value:?}")]
    TypeCoercion { column: String, value: String },

    /// A query ran against a dataset with no usable rows.
    #[error("NO_DATA: {0}")]
    NoData(String),

    /// Upstream fetch failed (network-level).
    #[error("FETCH_FAILED: {0}")]
    Fetch(String),

    /// Upstream fetch timed out.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Upstream returned a non-success HTTP status.
    #[error("HTTP_ERROR: status {0}")]
    HttpStatus(u16),

    /// Census API rejected the key.
    #[error("API_AUTH_ERROR: {0}")]
    ApiAuth(String),

    /// Census API rate limited the request.
    #[error("API_RATE_LIMITED: {0}")]
    ApiRateLimited(String),

    /// Upstream payload could not be parsed.
    #[error("PARSE_ERROR: {0}")]
    Parse(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NoData("state table is empty".to_string());
        assert!(err.to_string().contains("NO_DATA"));
        assert!(err.to_string().contains("state table"));
    }

    #[test]
    fn test_coercion_display() {
        let err = Error::TypeCoercion { column: "cases".into(), value: "n/a".into() };
        let msg = err.to_string();
        assert!(msg.contains("cases"));
        assert!(msg.contains("n/a"));
    }
}
