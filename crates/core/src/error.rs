// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors: the run aborts and nothing downstream is produced.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Log file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Permission denied reading file: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write output {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot serialize listings for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ExtractError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}

/// A candidate region that does not tokenize as delimited text.
///
/// Recoverable: the region is discarded and the scan continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DelimitedError {
    #[error("Unterminated quoted field in record {record}")]
    UnterminatedQuote { record: usize },

    #[error("Field larger than field limit ({limit}) in record {record}")]
    FieldTooLarge { record: usize, limit: usize },

    #[error("Carriage return inside unquoted field in record {record}")]
    BareCarriageReturn { record: usize },
}

/// Errors loading a `HarvestConfig` file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("IO error reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed TOML in config {path}: {message}")]
    MalformedToml { path: PathBuf, message: String },
}

impl ConfigError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}
