//! Census API request types.

use super::error::CensusError;
use casetrack_core::catalog::Dataset;
use serde::Serialize;

/// Query parameters for one census population request.
///
/// Serialized straight into the query string: `get` is the comma-separated
/// variable list, `for` the geography filter. The API key is appended
/// separately by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CensusRequest {
    /// Variable list for the `get` parameter.
    pub get: String,

    /// Geography filter for the `for` parameter.
    #[serde(rename = "for")]
    pub geography: String,
}

impl CensusRequest {
    /// The fixed request shape for each census dataset.
    ///
    /// The national query has no NAME variable; the API does not serve it
    /// at that granularity.
    pub fn for_dataset(dataset: Dataset) -> Result<Self, CensusError> {
        match dataset {
            Dataset::UsCensus => Ok(Self { get: "POP,DENSITY".into(), geography: "us:*".into() }),
            Dataset::StateCensus => Ok(Self { get: "POP,DENSITY,NAME".into(), geography: "state:*".into() }),
            Dataset::CountyCensus => Ok(Self { get: "POP,DENSITY,NAME".into(), geography: "county:*".into() }),
            other => Err(CensusError::NotACensusDataset(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_per_dataset() {
        let us = CensusRequest::for_dataset(Dataset::UsCensus).unwrap();
        assert_eq!(us.get, "POP,DENSITY");
        assert_eq!(us.geography, "us:*");

        let state = CensusRequest::for_dataset(Dataset::StateCensus).unwrap();
        assert_eq!(state.get, "POP,DENSITY,NAME");
        assert_eq!(state.geography, "state:*");

        let county = CensusRequest::for_dataset(Dataset::CountyCensus).unwrap();
        assert_eq!(county.geography, "county:*");
    }

    #[test]
    fn test_time_series_dataset_rejected() {
        let result = CensusRequest::for_dataset(Dataset::State);
        assert!(matches!(result, Err(CensusError::NotACensusDataset(_))));
    }

    #[test]
    fn test_query_serialization_uses_for() {
        let request = CensusRequest::for_dataset(Dataset::StateCensus).unwrap();
        let query = serde_urlencoded_stub(&request);
        assert!(query.contains("for=state"));
        assert!(query.contains("get=POP"));
    }

    // serde_json stands in for the query-string encoder; only key names matter here.
    fn serde_urlencoded_stub(request: &CensusRequest) -> String {
        let value = serde_json::to_value(request).unwrap();
        value
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v.as_str().unwrap_or_default()))
            .collect::<Vec<_>>()
            .join("&")
    }
}
