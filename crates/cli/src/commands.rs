//! CLI commands for refreshing and querying the cache.
//!
//! Provides refresh, status, top, dates, series, and show subcommands.
//! Query commands read the cached tables only; refresh is the single
//! entry point that talks to the upstream sources.

use anyhow::{Context, bail};
use casetrack_client::{CensusClient, CensusConfig, FeedClient, FeedConfig, UpstreamSources};
use casetrack_core::query::{self, Metric, RegionScope, SortDirection};
use casetrack_core::refresh::{self, RefreshDecision};
use casetrack_core::{AppConfig, Dataset, StoreDb};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "casetrack", version, about = "Cache and explore COVID-19 case and census data")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a refresh pass over all six datasets
    Refresh,
    /// Show ledger state per dataset
    Status,
    /// Rank regions by a metric
    Top {
        /// Metric to rank by
        #[arg(long, value_enum)]
        metric: MetricArg,
        /// Sort direction
        #[arg(long, value_enum, default_value = "desc")]
        order: OrderArg,
        /// Rank counties within this state (2-digit FIPS) instead of states
        #[arg(long)]
        state: Option<String>,
        /// How many regions to return
        #[arg(long, default_value_t = 5)]
        limit: u32,
    },
    /// List the dates cached for a time-series dataset
    Dates {
        #[arg(value_enum)]
        dataset: SeriesArg,
    },
    /// Print one region's (date, value) series
    Series {
        #[arg(value_enum)]
        dataset: SeriesArg,
        /// Region FIPS code (omit for the national series)
        #[arg(long)]
        region: Option<String>,
        #[arg(long, value_enum, default_value = "cases")]
        metric: SeriesMetricArg,
    },
    /// Show one region's numbers for one date
    Show {
        #[arg(value_enum)]
        dataset: SeriesArg,
        /// Region FIPS code (omit for the national table)
        #[arg(long)]
        region: Option<String>,
        /// Date to show, clamped to the cached range; defaults to the latest
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum MetricArg {
    Cases,
    Deaths,
    Pop,
    Density,
}

impl From<MetricArg> for Metric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Cases => Metric::Cases,
            MetricArg::Deaths => Metric::Deaths,
            MetricArg::Pop => Metric::Population,
            MetricArg::Density => Metric::Density,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderArg {
    Asc,
    Desc,
}

impl From<OrderArg> for SortDirection {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Asc => SortDirection::Ascending,
            OrderArg::Desc => SortDirection::Descending,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SeriesArg {
    Us,
    State,
    County,
}

impl From<SeriesArg> for Dataset {
    fn from(arg: SeriesArg) -> Self {
        match arg {
            SeriesArg::Us => Dataset::Us,
            SeriesArg::State => Dataset::State,
            SeriesArg::County => Dataset::County,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeriesMetricArg {
    Cases,
    Deaths,
}

impl From<SeriesMetricArg> for Metric {
    fn from(arg: SeriesMetricArg) -> Self {
        match arg {
            SeriesMetricArg::Cases => Metric::Cases,
            SeriesMetricArg::Deaths => Metric::Deaths,
        }
    }
}

pub async fn run(cli: Cli, config: &AppConfig, db: &StoreDb) -> anyhow::Result<()> {
    match cli.command {
        Command::Refresh => refresh(config, db).await,
        Command::Status => status(db).await,
        Command::Top { metric, order, state, limit } => top(db, metric, order, state, limit).await,
        Command::Dates { dataset } => dates(db, dataset.into()).await,
        Command::Series { dataset, region, metric } => series(db, dataset.into(), region, metric.into()).await,
        Command::Show { dataset, region, date } => show(db, dataset.into(), region, date).await,
    }
}

async fn refresh(config: &AppConfig, db: &StoreDb) -> anyhow::Result<()> {
    tracing::info!(db = %config.db_path.display(), "starting refresh pass");

    let feed = FeedClient::new(FeedConfig {
        base_url: config.feed_base_url.clone(),
        user_agent: config.user_agent.clone(),
        timeout: config.timeout(),
    })
    .context("building feed client")?;

    // Key requirement is deferred: a pass over fresh census tables never
    // contacts the census API.
    let sources = if config.census_api_key.is_some() {
        let api_key = config.require_census_api_key()?.to_string();
        let census = CensusClient::new(CensusConfig {
            api_key,
            base_url: config.census_base_url.clone(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
        })
        .context("building census client")?;
        UpstreamSources::new(feed, census)
    } else {
        tracing::debug!("census API key not set; census loads will fail if one is needed");
        UpstreamSources::without_census(feed)
    };

    let report = refresh::refresh_all(db, &sources).await.context("refresh pass failed")?;
    for outcome in &report.outcomes {
        match (outcome.decision, outcome.rows_loaded) {
            (RefreshDecision::Fresh, _) => println!("{:<14} fresh", outcome.dataset),
            (RefreshDecision::Missing, Some(rows)) => println!("{:<14} loaded ({rows} rows)", outcome.dataset),
            (RefreshDecision::Stale, Some(rows)) => println!("{:<14} reloaded ({rows} rows)", outcome.dataset),
            (decision, None) => println!("{:<14} {decision:?}", outcome.dataset),
        }
    }
    Ok(())
}

async fn status(db: &StoreDb) -> anyhow::Result<()> {
    let timings = db.reconcile().await?;
    let now = Utc::now();
    for dataset in Dataset::ALL {
        match timings.get(&dataset) {
            Some(at) => {
                let age = now - *at;
                let label = match refresh::decide(dataset, Some(*at), now) {
                    RefreshDecision::Fresh => "fresh",
                    RefreshDecision::Stale => "stale",
                    RefreshDecision::Missing => "missing",
                };
                println!(
                    "{:<14} {}  ({}h {:02}m old, {label})",
                    dataset,
                    at.format("%Y-%m-%d %H:%M:%SZ"),
                    age.num_hours(),
                    age.num_minutes() % 60,
                );
            }
            None => println!("{dataset:<14} not loaded"),
        }
    }
    Ok(())
}

async fn top(
    db: &StoreDb, metric: MetricArg, order: OrderArg, state: Option<String>, limit: u32,
) -> anyhow::Result<()> {
    let scope = match &state {
        Some(fips) => RegionScope::CountiesOf(fips.clone()),
        None => RegionScope::States,
    };

    let codes = query::top_regions(db, &scope, metric.into(), order.into(), limit)
        .await
        .context("ranking failed; have you run `casetrack refresh`?")?;

    let names = match scope {
        RegionScope::States => query::series::state_names(db).await?,
        RegionScope::CountiesOf(_) => query::series::county_names(db).await?,
    };

    for (rank, code) in codes.iter().enumerate() {
        match names.get(code) {
            Some(name) => println!("{}. {code}  {name}", rank + 1),
            None => println!("{}. {code}", rank + 1),
        }
    }
    Ok(())
}

async fn dates(db: &StoreDb, dataset: Dataset) -> anyhow::Result<()> {
    for date in query::series::distinct_dates(db, dataset).await? {
        println!("{date}");
    }
    Ok(())
}

async fn series(db: &StoreDb, dataset: Dataset, region: Option<String>, metric: Metric) -> anyhow::Result<()> {
    let points = query::series::series(db, dataset, region.as_deref(), metric).await?;
    for point in points {
        println!("{} {}", point.date, point.value);
    }
    Ok(())
}

async fn show(db: &StoreDb, dataset: Dataset, region: Option<String>, date: Option<String>) -> anyhow::Result<()> {
    let date = match date {
        Some(requested) => query::series::clamp_date(db, dataset, &requested).await?,
        None => match query::series::latest_date(db, dataset).await? {
            Some(date) => date,
            None => bail!("{dataset} table has no rows"),
        },
    };

    let Some(day) = query::series::region_day(db, dataset, region.as_deref(), &date).await? else {
        bail!("no row for that region on {date}");
    };

    println!("date:     {}", day.date);
    println!("cases:    {}", day.cases);
    println!("deaths:   {}", day.deaths);
    println!("pop:      {}", day.pop);
    match day.density {
        Some(density) => println!("density:  {density}"),
        None => println!("density:  n/a"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_refresh() {
        let cli = Cli::try_parse_from(["casetrack", "refresh"]).unwrap();
        assert!(matches!(cli.command, Command::Refresh));
    }

    #[test]
    fn test_parse_top_defaults() {
        let cli = Cli::try_parse_from(["casetrack", "top", "--metric", "pop"]).unwrap();
        match cli.command {
            Command::Top { metric, order, state, limit } => {
                assert!(matches!(metric, MetricArg::Pop));
                assert_eq!(order, OrderArg::Desc);
                assert!(state.is_none());
                assert_eq!(limit, 5);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_top_counties() {
        let cli =
            Cli::try_parse_from(["casetrack", "top", "--metric", "cases", "--order", "asc", "--state", "26"]).unwrap();
        match cli.command {
            Command::Top { order, state, .. } => {
                assert_eq!(order, OrderArg::Asc);
                assert_eq!(state.as_deref(), Some("26"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_series() {
        let cli = Cli::try_parse_from(["casetrack", "series", "state", "--region", "26", "--metric", "deaths"]).unwrap();
        match cli.command {
            Command::Series { dataset, region, metric } => {
                assert!(matches!(dataset, SeriesArg::State));
                assert_eq!(region.as_deref(), Some("26"));
                assert_eq!(metric, SeriesMetricArg::Deaths);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_metric() {
        let result = Cli::try_parse_from(["casetrack", "top", "--metric", "vibes"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_metric_arg_mapping() {
        assert!(matches!(Metric::from(MetricArg::Pop), Metric::Population));
        assert!(matches!(Metric::from(MetricArg::Cases), Metric::Cases));
    }
}
