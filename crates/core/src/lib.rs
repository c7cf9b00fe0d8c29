//! Core types and shared functionality for casetrack.
//!
//! This crate provides:
//! - The SQLite store, timing ledger, and dataset tables
//! - The dataset catalog and per-family schema policy
//! - The refresh orchestrator and its upstream source seam
//! - Ranking and series queries over the cached tables
//! - Configuration structures and unified error types

pub mod catalog;
pub mod config;
pub mod error;
pub mod query;
pub mod refresh;
pub mod store;

pub use catalog::{Dataset, DatasetFamily, TableData, TableSchema};
pub use config::AppConfig;
pub use error::Error;
pub use store::StoreDb;
