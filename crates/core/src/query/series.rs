//! Per-region series and detail queries.
//!
//! These back the chart and detail views downstream: date listings,
//! per-region (date, value) series, and single-day rows joined with the
//! matching census figures.

use super::{Metric, validate_fips};
use crate::Error;
use crate::catalog::{Dataset, DatasetFamily};
use crate::store::StoreDb;
use std::collections::BTreeMap;
use tokio_rusqlite::params;

/// One point of a per-region series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesPoint {
    pub date: String,
    pub value: i64,
}

/// A single day for one region, joined with its census row.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionDay {
    pub date: String,
    pub cases: i64,
    pub deaths: i64,
    pub pop: i64,
    pub density: Option<f64>,
}

fn require_time_series(dataset: Dataset) -> Result<(), Error> {
    if dataset.family() == DatasetFamily::TimeSeries {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("{dataset} is not a time-series dataset")))
    }
}

/// Region code expected for a time-series dataset: none for the national
/// table, a 2-digit FIPS for states, a 5-digit FIPS for counties.
fn require_region(dataset: Dataset, region: Option<&str>) -> Result<Option<String>, Error> {
    match (dataset, region) {
        (Dataset::Us, None) => Ok(None),
        (Dataset::Us, Some(_)) => Err(Error::InvalidInput("the national series takes no region code".into())),
        (Dataset::State, Some(code)) => {
            validate_fips(code, 2)?;
            Ok(Some(code.to_string()))
        }
        (Dataset::County, Some(code)) => {
            validate_fips(code, 5)?;
            Ok(Some(code.to_string()))
        }
        (Dataset::State | Dataset::County, None) => {
            Err(Error::InvalidInput(format!("{dataset} series requires a region code")))
        }
        _ => Err(Error::InvalidInput(format!("{dataset} is not a time-series dataset"))),
    }
}

/// All distinct dates present in a time-series table, ascending.
pub async fn distinct_dates(db: &StoreDb, dataset: Dataset) -> Result<Vec<String>, Error> {
    require_time_series(dataset)?;
    let sql = format!("SELECT DISTINCT date FROM {} ORDER BY date", dataset.table_name());
    db.conn
        .call(move |conn| -> Result<Vec<String>, Error> {
            let mut stmt = conn.prepare(&sql).map_err(Error::from)?;
            let dates = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(Error::from)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(Error::from)?;
            Ok(dates)
        })
        .await
        .map_err(Error::from)
}

/// Most recent date present in a time-series table.
pub async fn latest_date(db: &StoreDb, dataset: Dataset) -> Result<Option<String>, Error> {
    require_time_series(dataset)?;
    let sql = format!("SELECT MAX(date) FROM {}", dataset.table_name());
    db.conn
        .call(move |conn| -> Result<Option<String>, Error> {
            let date: Option<String> = conn.query_row(&sql, [], |row| row.get(0)).map_err(Error::from)?;
            Ok(date)
        })
        .await
        .map_err(Error::from)
}

/// Resolve a requested date to the nearest one actually cached.
///
/// A date before the cached range clamps to the first available date, one
/// after it to the last; a cached date passes through unchanged. This is
/// the original application's silent nearest-date redirect, kept as
/// explicit behavior.
pub async fn clamp_date(db: &StoreDb, dataset: Dataset, requested: &str) -> Result<String, Error> {
    let dates = distinct_dates(db, dataset).await?;
    let (Some(first), Some(last)) = (dates.first(), dates.last()) else {
        return Err(Error::NoData(format!("{dataset} table has no rows")));
    };
    if dates.iter().any(|d| d == requested) {
        Ok(requested.to_string())
    } else if requested < first.as_str() {
        Ok(first.clone())
    } else {
        Ok(last.clone())
    }
}

/// (date, value) series for one region, ascending by date.
///
/// Only case and death series exist; population metrics have no dates.
pub async fn series(
    db: &StoreDb, dataset: Dataset, region: Option<&str>, metric: Metric,
) -> Result<Vec<SeriesPoint>, Error> {
    if !metric.is_time_series() {
        return Err(Error::InvalidInput(format!("{:?} is not a time-series metric", metric)));
    }
    let region = require_region(dataset, region)?;

    let column = metric.column();
    let table = dataset.table_name();
    let sql = match region {
        Some(_) => format!("SELECT date, {column} FROM {table} WHERE fips = ?1 ORDER BY date"),
        None => format!("SELECT date, {column} FROM {table} ORDER BY date"),
    };

    db.conn
        .call(move |conn| -> Result<Vec<SeriesPoint>, Error> {
            let mut stmt = conn.prepare(&sql).map_err(Error::from)?;
            let points = match &region {
                Some(code) => stmt.query_map(params![code], point_from_row),
                None => stmt.query_map([], point_from_row),
            }
            .map_err(Error::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::from)?;
            Ok(points)
        })
        .await
        .map_err(Error::from)
}

fn point_from_row(row: &tokio_rusqlite::rusqlite::Row<'_>) -> Result<SeriesPoint, tokio_rusqlite::rusqlite::Error> {
    Ok(SeriesPoint { date: row.get(0)?, value: row.get(1)? })
}

/// One region's row for one date, joined with its census figures.
///
/// Returns None when the exact date is absent; callers wanting the
/// original's forgiving behavior run the date through [`clamp_date`]
/// first.
pub async fn region_day(
    db: &StoreDb, dataset: Dataset, region: Option<&str>, date: &str,
) -> Result<Option<RegionDay>, Error> {
    let region = require_region(dataset, region)?;
    let date = date.to_string();

    let sql = match dataset {
        Dataset::Us => "SELECT u.date, u.cases, u.deaths, c.pop, c.density
                        FROM us u, us_census c WHERE u.date = ?1"
            .to_string(),
        Dataset::State => "SELECT s.date, s.cases, s.deaths, c.pop, c.density
                           FROM state s JOIN state_census c ON s.fips = c.state
                           WHERE s.fips = ?1 AND s.date = ?2"
            .to_string(),
        Dataset::County => "SELECT s.date, s.cases, s.deaths, c.pop, c.density
                            FROM county s JOIN county_census c ON s.fips = c.state || c.county
                            WHERE s.fips = ?1 AND s.date = ?2"
            .to_string(),
        other => return Err(Error::InvalidInput(format!("{other} is not a time-series dataset"))),
    };

    db.conn
        .call(move |conn| -> Result<Option<RegionDay>, Error> {
            let result = match &region {
                Some(code) => conn.query_row(&sql, params![code, date], day_from_row),
                None => conn.query_row(&sql, params![date], day_from_row),
            };
            match result {
                Ok(day) => Ok(Some(day)),
                Err(tokio_rusqlite::rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(Error::from)
}

fn day_from_row(row: &tokio_rusqlite::rusqlite::Row<'_>) -> Result<RegionDay, tokio_rusqlite::rusqlite::Error> {
    Ok(RegionDay {
        date: row.get(0)?,
        cases: row.get(1)?,
        deaths: row.get(2)?,
        pop: row.get(3)?,
        density: row.get(4)?,
    })
}

/// State FIPS → display name, from the state census table.
pub async fn state_names(db: &StoreDb) -> Result<BTreeMap<String, String>, Error> {
    db.conn
        .call(|conn| -> Result<BTreeMap<String, String>, Error> {
            let mut stmt = conn.prepare("SELECT state, name FROM state_census").map_err(Error::from)?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
                .map_err(Error::from)?;
            let mut names = BTreeMap::new();
            for row in rows {
                let (fips, name) = row.map_err(Error::from)?;
                names.insert(fips, name);
            }
            Ok(names)
        })
        .await
        .map_err(Error::from)
}

/// County FIPS (state||county) → display name, truncated at the first
/// comma ("Washtenaw County, Michigan" → "Washtenaw County").
pub async fn county_names(db: &StoreDb) -> Result<BTreeMap<String, String>, Error> {
    db.conn
        .call(|conn| -> Result<BTreeMap<String, String>, Error> {
            let mut stmt = conn
                .prepare("SELECT state || county, name FROM county_census")
                .map_err(Error::from)?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
                .map_err(Error::from)?;
            let mut names = BTreeMap::new();
            for row in rows {
                let (fips, name) = row.map_err(Error::from)?;
                let short = name.split(',').next().unwrap_or(&name).to_string();
                names.insert(fips, short);
            }
            Ok(names)
        })
        .await
        .map_err(Error::from)
}

/// Distinct state FIPS codes present in the state series, ascending.
pub async fn state_codes(db: &StoreDb) -> Result<Vec<String>, Error> {
    db.conn
        .call(|conn| -> Result<Vec<String>, Error> {
            let mut stmt = conn
                .prepare("SELECT DISTINCT fips FROM state ORDER BY fips")
                .map_err(Error::from)?;
            let codes = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(Error::from)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(Error::from)?;
            Ok(codes)
        })
        .await
        .map_err(Error::from)
}

/// Distinct county FIPS codes within one state, ascending.
pub async fn county_codes(db: &StoreDb, state: &str) -> Result<Vec<String>, Error> {
    validate_fips(state, 2)?;
    let state = state.to_string();
    db.conn
        .call(move |conn| -> Result<Vec<String>, Error> {
            let mut stmt = conn
                .prepare("SELECT DISTINCT fips FROM county WHERE substr(fips, 1, 2) = ?1 ORDER BY fips")
                .map_err(Error::from)?;
            let codes = stmt
                .query_map(params![state], |row| row.get::<_, String>(0))
                .map_err(Error::from)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(Error::from)?;
            Ok(codes)
        })
        .await
        .map_err(Error::from)
}
