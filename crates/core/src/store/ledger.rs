//! Timing ledger operations.
//!
//! The `timings` table maps each cached dataset to its last-refresh
//! timestamp and is the source of truth for staleness decisions. The
//! ledger and the dataset tables are written in separate steps, so a
//! crash can leave them disagreeing; `reconcile` repairs either direction
//! of drift on the next run.

use super::connection::StoreDb;
use crate::Error;
use crate::catalog::Dataset;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Name of the ledger's backing table.
pub const LEDGER_TABLE: &str = "timings";

fn ensure_ledger(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS timings (dataset TEXT PRIMARY KEY, refreshed_at TEXT NOT NULL)",
        [],
    )?;
    Ok(())
}

fn list_user_tables(conn: &rusqlite::Connection) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

// Table names here come back out of sqlite_master, not the dataset enum.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl StoreDb {
    /// Reconcile the ledger with the tables that actually exist.
    ///
    /// Ensures the ledger table exists, drops any table with no ledger row
    /// (except the ledger itself), deletes any ledger row whose table is
    /// gone, and returns the resulting consistent dataset → last-refresh
    /// mapping. A row with an unreadable timestamp is treated the same as
    /// a missing one: row and table are both removed so the dataset is
    /// re-fetched on the next pass.
    pub async fn reconcile(&self) -> Result<BTreeMap<Dataset, DateTime<Utc>>, Error> {
        self.conn
            .call(|conn| -> Result<BTreeMap<Dataset, DateTime<Utc>>, Error> {
                ensure_ledger(conn)?;

                let entries: Vec<(String, String)> = {
                    let mut stmt = conn.prepare("SELECT dataset, refreshed_at FROM timings")?;
                    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
                    rows.collect::<Result<Vec<_>, _>>()?
                };

                for table in list_user_tables(conn)? {
                    if table != LEDGER_TABLE && !entries.iter().any(|(name, _)| *name == table) {
                        tracing::warn!(table = %table, "dropping orphaned table with no ledger entry");
                        conn.execute(&format!("DROP TABLE {}", quote_ident(&table)), [])?;
                    }
                }

                let tables = list_user_tables(conn)?;
                let mut timings = BTreeMap::new();
                for (name, stamp) in entries {
                    if !tables.contains(&name) {
                        conn.execute("DELETE FROM timings WHERE dataset = ?1", params![name])?;
                        continue;
                    }
                    let Some(dataset) = Dataset::from_table_name(&name) else {
                        tracing::warn!(table = %name, "ledger entry for unknown table; leaving in place");
                        continue;
                    };
                    match DateTime::parse_from_rfc3339(&stamp) {
                        Ok(at) => {
                            timings.insert(dataset, at.with_timezone(&Utc));
                        }
                        Err(_) => {
                            tracing::warn!(
                                table = %name,
                                stamp = %stamp,
                                "unreadable ledger timestamp; dropping table for reload"
                            );
                            conn.execute("DELETE FROM timings WHERE dataset = ?1", params![name])?;
                            conn.execute(&format!("DROP TABLE {}", quote_ident(&name)), [])?;
                        }
                    }
                }

                Ok(timings)
            })
            .await
            .map_err(Error::from)
    }

    /// Record a successful refresh of a dataset.
    ///
    /// Uses UPSERT semantics: inserts if the dataset has no row, updates
    /// the timestamp if it does.
    pub async fn record_refresh(&self, dataset: Dataset, at: DateTime<Utc>) -> Result<(), Error> {
        let stamp = at.to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_ledger(conn)?;
                conn.execute(
                    "INSERT INTO timings (dataset, refreshed_at) VALUES (?1, ?2)
                     ON CONFLICT(dataset) DO UPDATE SET refreshed_at = excluded.refreshed_at",
                    params![dataset.table_name(), stamp],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
