// crates/core/src/config.rs
//! Tunables for the extraction heuristics.
//!
//! Every field has a default matching the behavior the heuristics were
//! calibrated against, so an empty TOML file (or no file at all) is valid.

use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;

use crate::error::ConfigError;

pub const DEFAULT_MIN_COLUMNS: usize = 6;
pub const DEFAULT_SHORT_BULLET_MAX_LEN: usize = 5;
pub const DEFAULT_PHONE_PREFIX: &str = "+1-";
pub const DEFAULT_CALLOUT_MARKER: &str = "**Phase";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarvestConfig {
    /// Rows with fewer fields are rejected.
    pub min_columns: usize,
    /// A `*` line is a stop condition when its trimmed length is below this.
    pub short_bullet_max_len: usize,
    /// A short `*` line containing this substring is kept as data.
    pub phone_prefix: String,
    /// Lines starting with this marker close an open region.
    pub callout_marker: String,
    /// Date stamped on listings with TSBC verification.
    pub verified_on: Option<NaiveDate>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            min_columns: DEFAULT_MIN_COLUMNS,
            short_bullet_max_len: DEFAULT_SHORT_BULLET_MAX_LEN,
            phone_prefix: DEFAULT_PHONE_PREFIX.to_string(),
            callout_marker: DEFAULT_CALLOUT_MARKER.to_string(),
            verified_on: None,
        }
    }
}

impl HarvestConfig {
    pub fn from_toml_str(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::MalformedToml {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load a config file. The file must exist; use `Default` when there is none.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_toml_str(path, &contents)
    }
}
