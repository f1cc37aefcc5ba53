use std::{
    fs::write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt::time::UtcTime, EnvFilter};

use crate::{config::Config, db::PgStore, model::Element};

mod config;
mod db;
mod export;
mod matcher;
mod model;
mod overpass;
mod pipeline;
mod stats;
mod utils;

/// Fetch toll booths from Overpass, match them to highways and load them into PostGIS.
#[derive(Debug, Parser)]
struct Cli {
    /// TOML config file [default: tolls.toml]
    #[arg(long)]
    config: Option<PathBuf>,
    /// Read a saved Overpass response instead of querying the API
    #[arg(long)]
    input: Option<PathBuf>,
    /// Save the raw Overpass response here
    #[arg(long, conflicts_with = "input")]
    save_raw: Option<PathBuf>,
    /// CSV output path
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Area to search, by its name tag
    #[arg(long)]
    area: Option<String>,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path, true)?,
        None => Config::load(Path::new(config::DEFAULT_PATH), false)?,
    };
    if let Some(x) = cli.area.clone() {
        config.overpass.area = x;
    }
    if let Some(x) = cli.csv.clone() {
        config.output.csv = x;
    }

    let elements = load_elements(&cli, &config)?;
    info!("received {} elements (nodes + ways)", elements.len());

    let summary = pipeline::run(elements, &config.output.csv, || {
        info!(db = %config.database.target(), "connecting to database");
        PgStore::connect(&config.database)
    })?;
    info!(
        total = summary.total,
        matched = summary.matched,
        located = summary.located,
        csv = summary.csv_written,
        inserted = summary.report.inserted,
        updated = summary.report.updated,
        "successfully processed {} records",
        summary.report.total()
    );

    Ok(())
}

fn load_elements(cli: &Cli, config: &Config) -> Result<Vec<Element>> {
    if let Some(path) = &cli.input {
        info!(path = %path.display(), "reading saved Overpass response");
        return overpass::read(path);
    }

    let overpass = &config.overpass;
    info!(url = %overpass.url, area = %overpass.area, "fetching toll booths and highways");
    let query = overpass::toll_query(&overpass.area, overpass.timeout);
    let body = overpass::fetch(&overpass::agent(), &overpass.url, &query)
        .context("Failed to fetch from Overpass")?;

    if let Some(path) = &cli.save_raw {
        match write(path, &body) {
            Ok(()) => info!(path = %path.display(), "saved raw response"),
            Err(e) => error!(path = %path.display(), "failed to save raw response: {e}"),
        }
    }

    overpass::parse(&body)
}
