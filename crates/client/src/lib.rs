//! Upstream HTTP clients for casetrack.
//!
//! This crate provides:
//! - `feed`: the flat CSV time-series feeds (cases/deaths per region per day)
//! - `census`: the keyed census population API
//! - `sources`: wiring of both clients into the orchestrator's
//!   `DatasetSource` seam

pub mod census;
pub mod feed;
pub mod sources;

pub use census::{CensusClient, CensusConfig, CensusError};
pub use feed::{FeedClient, FeedConfig, FeedError};
pub use sources::UpstreamSources;
