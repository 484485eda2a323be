// crates/cli/src/main.rs
//! contractor-harvest binary.
//!
//! Reads the whole log, runs the extraction pipeline, writes the
//! consolidated CSV and, when asked, the directory listings JSON.

mod cli;

use anyhow::Context;
use clap::Parser;
use contractor_harvest_core::listing::{
    archive_listings_file, build_listings, city_summary, region_summary, write_listings_file,
};
use contractor_harvest_core::{extract_file, write_rows_file, Extraction};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

/// Rows echoed back after a run.
const SAMPLE_ROWS: usize = 5;

/// Cities listed in the listings summary.
const TOP_CITIES: usize = 10;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("contractor-harvest error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level())?;

    let mut config = cli.resolve_config().context("failed to load configuration")?;

    let extraction = extract_file(&cli.input, &config)
        .await
        .with_context(|| format!("failed to read log {}", cli.input.display()))?;

    write_rows_file(&cli.output, &extraction.rows).await?;
    print_summary(&extraction);
    println!("Saved to {}", cli.output.display());

    if let Some(path) = &cli.listings {
        if config.verified_on.is_none() {
            config.verified_on = Some(chrono::Local::now().date_naive());
        }
        let listings = build_listings(&extraction.rows, config.verified_on);
        if let Some(archive) = archive_listings_file(path).await? {
            println!("Archived previous listings -> {}", archive.display());
        }
        write_listings_file(path, &listings).await?;
        for (region, count) in region_summary(&listings) {
            info!(region = region.as_str(), count, "Listings by region");
        }
        println!("Written {} listings -> {}", listings.len(), path.display());
        println!("\nTop cities:");
        for (city, count) in city_summary(&listings, TOP_CITIES) {
            println!("  {city}: {count}");
        }
    }

    Ok(())
}

fn init_tracing(default_level: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_env("HARVEST_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

fn print_summary(extraction: &Extraction) {
    let report = &extraction.report;
    println!(
        "Found {} assistant messages with table data",
        report.text_blocks
    );
    if report.regions_discarded > 0 {
        println!("Discarded {} unparseable table fragments", report.regions_discarded);
    }
    println!("Total unique rows extracted: {}", extraction.rows.len());

    if extraction.rows.is_empty() {
        return;
    }
    println!("\nSample rows:");
    for row in extraction.rows.iter().take(SAMPLE_ROWS) {
        let status = if row.fields().len() > contractor_harvest_core::STATUS_INDEX {
            row.status()
        } else {
            "?"
        };
        println!("  {} | {} | {}", row.name(), row.city(), status);
    }
}
