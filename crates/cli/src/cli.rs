// crates/cli/src/cli.rs
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use contractor_harvest_core::{ConfigError, HarvestConfig};

/// Extract contractor tables embedded in a conversation log into one
/// deduplicated CSV.
#[derive(Debug, Parser)]
#[command(name = "contractor-harvest", version)]
pub struct Cli {
    /// Conversation log, one JSON envelope per line.
    #[arg(short, long, env = "HARVEST_INPUT")]
    pub input: PathBuf,

    /// Consolidated CSV output.
    #[arg(
        short,
        long,
        env = "HARVEST_OUTPUT",
        default_value = "contractors_master.csv"
    )]
    pub output: PathBuf,

    /// Also write directory listings as JSON.
    #[arg(long, env = "HARVEST_LISTINGS")]
    pub listings: Option<PathBuf>,

    /// TOML file with heuristic tunables.
    #[arg(long, env = "HARVEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Minimum field count for a row to be kept.
    #[arg(long)]
    pub min_columns: Option<usize>,

    /// Bullet lines shorter than this close an open table.
    #[arg(long)]
    pub bullet_max_len: Option<usize>,

    /// Date stamped on TSBC-verified listings (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub verified_on: Option<NaiveDate>,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log every skipped envelope and rejected row.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Config file (if any), then flag overrides.
    pub fn resolve_config(&self) -> Result<HarvestConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => HarvestConfig::load(path)?,
            None => HarvestConfig::default(),
        };
        if let Some(min_columns) = self.min_columns {
            config.min_columns = min_columns;
        }
        if let Some(len) = self.bullet_max_len {
            config.short_bullet_max_len = len;
        }
        if self.verified_on.is_some() {
            config.verified_on = self.verified_on;
        }
        Ok(config)
    }

    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "warn,contractor_harvest=info"
        }
    }
}
