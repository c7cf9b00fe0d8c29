//! Region ranking for comparison charts.
//!
//! Answers "top N regions by metric" against the cached tables.
//! Time-series metrics rank on the most recent date present; census
//! metrics rank the census table directly. Ties break on the store's
//! natural row order, which is acceptable because rankings only drive
//! chart selection.

use super::validate_fips;
use crate::Error;
use crate::store::StoreDb;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Rankable metrics; each maps to one known column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Cases,
    Deaths,
    Population,
    Density,
}

impl Metric {
    pub(crate) fn column(self) -> &'static str {
        match self {
            Metric::Cases => "cases",
            Metric::Deaths => "deaths",
            Metric::Population => "pop",
            Metric::Density => "density",
        }
    }

    /// Whether the metric lives in the time-series tables (vs census).
    pub fn is_time_series(self) -> bool {
        matches!(self, Metric::Cases | Metric::Deaths)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn sql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// Which regions a ranking runs over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionScope {
    /// All states.
    States,
    /// Counties within one state, identified by its 2-digit FIPS code.
    CountiesOf(String),
}

/// Rank regions by a metric and return their FIPS codes, best first.
///
/// Time-series rankings use only the most recent date in the table and
/// only consider regions that also have a census row, so downstream name
/// lookups never miss.
pub async fn top_regions(
    db: &StoreDb, scope: &RegionScope, metric: Metric, direction: SortDirection, limit: u32,
) -> Result<Vec<String>, Error> {
    if let RegionScope::CountiesOf(state) = scope {
        validate_fips(state, 2)?;
    }

    let scope = scope.clone();
    db.conn
        .call(move |conn| -> Result<Vec<String>, Error> {
            let column = metric.column();
            let order = direction.sql();

            match (&scope, metric.is_time_series()) {
                (RegionScope::States, true) => {
                    let date = latest_date(conn, "state")?;
                    let sql = format!(
                        "SELECT fips FROM state
                         WHERE date = ?1 AND fips IN (SELECT state FROM state_census)
                         ORDER BY {column} {order} LIMIT ?2"
                    );
                    collect_codes(conn, &sql, params![date, limit])
                }
                (RegionScope::States, false) => {
                    let sql = format!("SELECT state FROM state_census ORDER BY {column} {order} LIMIT ?1");
                    collect_codes(conn, &sql, params![limit])
                }
                (RegionScope::CountiesOf(state), true) => {
                    let date = latest_date(conn, "county")?;
                    let sql = format!(
                        "SELECT fips FROM county
                         WHERE date = ?1
                           AND fips IN (SELECT state || county FROM county_census WHERE state = ?2)
                         ORDER BY {column} {order} LIMIT ?3"
                    );
                    collect_codes(conn, &sql, params![date, state, limit])
                }
                (RegionScope::CountiesOf(state), false) => {
                    let sql = format!(
                        "SELECT state || county FROM county_census WHERE state = ?1
                         ORDER BY {column} {order} LIMIT ?2"
                    );
                    collect_codes(conn, &sql, params![state, limit])
                }
            }
        })
        .await
        .map_err(Error::from)
}

fn latest_date(conn: &rusqlite::Connection, table: &str) -> Result<String, Error> {
    let sql = format!("SELECT MAX(date) FROM {table}");
    let date: Option<String> = conn.query_row(&sql, [], |row| row.get(0)).map_err(Error::from)?;
    date.ok_or_else(|| Error::NoData(format!("{table} table has no rows")))
}

fn collect_codes<P: rusqlite::Params>(
    conn: &rusqlite::Connection, sql: &str, params: P,
) -> Result<Vec<String>, Error> {
    let mut stmt = conn.prepare(sql).map_err(Error::from)?;
    let codes = stmt
        .query_map(params, |row| row.get::<_, String>(0))
        .map_err(Error::from)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(Error::from)?;
    Ok(codes)
}
