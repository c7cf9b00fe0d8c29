//! Read-only queries over the cached tables.
//!
//! Metric names, sort directions, and region scopes are closed
//! enumerations; region codes and dates are always bound as parameters.
//! Nothing in this module mutates the store.

pub mod rank;
pub mod series;

pub use rank::{Metric, RegionScope, SortDirection, top_regions};
pub use series::{RegionDay, SeriesPoint};

use crate::Error;

pub(crate) fn validate_fips(code: &str, len: usize) -> Result<(), Error> {
    if code.len() == len && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("malformed FIPS code {code:?} (expected {len} digits)")))
    }
}
