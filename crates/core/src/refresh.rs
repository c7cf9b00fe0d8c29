//! Refresh orchestration.
//!
//! Each dataset moves through a three-state machine on every pass:
//! Missing (no ledger entry) loads unconditionally, Fresh reuses the
//! cached table, Stale drops the table and loads as if missing. Census
//! datasets have no freshness window and never go stale. Datasets are
//! loaded sequentially and independently; any load failure aborts the
//! pass and surfaces to the caller.

use crate::Error;
use crate::catalog::{Dataset, TableData, TableSchema};
use crate::store::StoreDb;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

/// Age beyond which a time-series dataset must be reloaded.
pub const FRESHNESS_WINDOW_HOURS: i64 = 3;

pub fn freshness_window() -> Duration {
    Duration::hours(FRESHNESS_WINDOW_HOURS)
}

/// Per-dataset refresh decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshDecision {
    /// No ledger entry; load unconditionally.
    Missing,
    /// Ledger entry inside the window (or no window); reuse the table.
    Fresh,
    /// Ledger entry older than the window; drop, then load.
    Stale,
}

/// Decide what a refresh pass should do with one dataset.
pub fn decide(dataset: Dataset, last_refresh: Option<DateTime<Utc>>, now: DateTime<Utc>) -> RefreshDecision {
    match last_refresh {
        None => RefreshDecision::Missing,
        Some(at) => {
            if !dataset.family().has_freshness_window() {
                RefreshDecision::Fresh
            } else if now - at > freshness_window() {
                RefreshDecision::Stale
            } else {
                RefreshDecision::Fresh
            }
        }
    }
}

/// Upstream seam: anything that can produce a dataset's rows.
///
/// The orchestrator only sees this trait; the HTTP clients implement it in
/// the client crate, and tests script it in memory.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    async fn fetch(&self, dataset: Dataset) -> Result<TableData, Error>;
}

/// What happened to one dataset during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassOutcome {
    pub dataset: Dataset,
    pub decision: RefreshDecision,
    /// Rows loaded when the decision triggered a load.
    pub rows_loaded: Option<u64>,
}

/// Result of a whole refresh pass.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub outcomes: Vec<PassOutcome>,
    /// Reconciled ledger after the pass.
    pub timings: BTreeMap<Dataset, DateTime<Utc>>,
}

/// Fetch one dataset and replace its cached table.
///
/// The table is created only after a successful fetch, so a failed fetch
/// leaves no partial table behind. Table population and the ledger write
/// are separate steps; a crash in between leaves an orphan table that the
/// next reconciliation drops.
pub async fn load_dataset<S>(db: &StoreDb, source: &S, dataset: Dataset) -> Result<u64, Error>
where
    S: DatasetSource + ?Sized,
{
    let data = source.fetch(dataset).await?;
    let schema = TableSchema::derive(dataset, &data.header)?;
    db.create_table(&schema).await?;
    let inserted = db.insert_rows(&schema, data.rows).await?;
    db.record_refresh(dataset, Utc::now()).await?;
    tracing::info!(dataset = %dataset, rows = inserted, "dataset loaded");
    Ok(inserted)
}

/// Run one refresh pass over all datasets.
///
/// Reconciles the ledger, applies the per-dataset transition in catalog
/// order, and returns the outcomes together with the post-pass ledger.
pub async fn refresh_all<S>(db: &StoreDb, source: &S) -> Result<RefreshReport, Error>
where
    S: DatasetSource + ?Sized,
{
    let timings = db.reconcile().await?;
    let now = Utc::now();

    let mut outcomes = Vec::with_capacity(Dataset::ALL.len());
    for dataset in Dataset::ALL {
        let decision = decide(dataset, timings.get(&dataset).copied(), now);
        let rows_loaded = match decision {
            RefreshDecision::Fresh => {
                tracing::debug!(dataset = %dataset, "cached table is fresh");
                None
            }
            RefreshDecision::Missing => Some(load_dataset(db, source, dataset).await?),
            RefreshDecision::Stale => {
                tracing::info!(dataset = %dataset, "cached table is stale; reloading");
                db.drop_dataset(dataset).await?;
                Some(load_dataset(db, source, dataset).await?)
            }
        };
        outcomes.push(PassOutcome { dataset, decision, rows_loaded });
    }

    let timings = db.reconcile().await?;
    Ok(RefreshReport { outcomes, timings })
}
