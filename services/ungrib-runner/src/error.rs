//! Error types for the ungrib runner.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use wps_common::{MonthError, NamelistError, YearMonth};

/// Errors that abort a run.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Namelist(#[from] NamelistError),

    #[error("Failed to link GRIB files for {month}: {reason}")]
    LinkFailure { month: YearMonth, reason: String },

    #[error("Batch job submission failed: {reason}")]
    SubmitFailure { reason: String },

    #[error(
        "Gave up waiting for {month} output after {}s ({found}/{expected} files present)",
        waited.as_secs()
    )]
    TimeoutExceeded {
        month: YearMonth,
        waited: Duration,
        found: usize,
        expected: usize,
    },

    #[error("Invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;

/// Errors raised while assembling the run configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to resolve path {}: {source}", path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for '{name}': {message}")]
    Invalid { name: &'static str, message: String },

    #[error("Invalid month range: {0}")]
    Range(#[from] MonthError),
}
