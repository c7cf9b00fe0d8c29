//! Upstream source wiring for the refresh orchestrator.

use crate::census::{CensusClient, CensusError};
use crate::feed::FeedClient;
use async_trait::async_trait;
use casetrack_core::Error;
use casetrack_core::catalog::{Dataset, DatasetFamily, TableData};
use casetrack_core::refresh::DatasetSource;

/// The real upstream clients behind one [`DatasetSource`].
///
/// Routing is by dataset family: time-series datasets go to the CSV feed,
/// census datasets to the population API. The census client is optional so
/// the API key is only required when a census dataset actually has to be
/// fetched; a pass over fresh census tables never needs it.
pub struct UpstreamSources {
    feed: FeedClient,
    census: Option<CensusClient>,
}

impl UpstreamSources {
    pub fn new(feed: FeedClient, census: CensusClient) -> Self {
        Self { feed, census: Some(census) }
    }

    /// Feed-only wiring; census fetches will fail with a missing-key error.
    pub fn without_census(feed: FeedClient) -> Self {
        Self { feed, census: None }
    }
}

#[async_trait]
impl DatasetSource for UpstreamSources {
    async fn fetch(&self, dataset: Dataset) -> Result<TableData, Error> {
        match dataset.family() {
            DatasetFamily::TimeSeries => Ok(self.feed.fetch_series(dataset).await?),
            DatasetFamily::Census => match &self.census {
                Some(census) => Ok(census.fetch_population(dataset).await?),
                None => Err(CensusError::MissingApiKey.into()),
            },
        }
    }
}
