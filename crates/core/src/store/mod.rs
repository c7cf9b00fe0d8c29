//! SQLite-backed store for cached datasets and the timing ledger.
//!
//! This module provides the persistent store shared by the refresh
//! orchestrator and the query layer, with async access via tokio-rusqlite.
//! It supports:
//!
//! - WAL mode with the same pragma set for file and in-memory databases
//! - The `timings` ledger and its self-healing reconciliation
//! - Dynamic dataset tables created from resolved [`TableSchema`]s
//!
//! Lifecycle transitions (create table, drop table, ledger writes) are
//! only performed here; the query layer never mutates.

pub mod connection;
pub mod ledger;
pub mod table;

pub use crate::Error;

pub use connection::StoreDb;
pub use ledger::LEDGER_TABLE;
