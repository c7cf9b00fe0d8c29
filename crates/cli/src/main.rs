//! casetrack entry point.
//!
//! Boots tracing, loads configuration, opens the store, and dispatches
//! the parsed subcommand. Logging goes to stderr so command output on
//! stdout stays clean.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = commands::Cli::parse();
    let config = casetrack_core::AppConfig::load()?;
    let db = casetrack_core::StoreDb::open(&config.db_path).await?;

    commands::run(cli, &config, &db).await
}
