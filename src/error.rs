//! Error types for loading, selecting and aggregating tau series.

use std::path::PathBuf;

use chrono::NaiveDateTime;

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure while reading a tau source. Any of these aborts the whole load.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: expected 3 fields (date, time, tau), found {found}")]
    FieldCount { row: usize, found: usize },

    #[error("row {row}: '{value}' is not a valid date")]
    Date { row: usize, value: String },

    #[error("row {row}: '{value}' is not a valid time")]
    Time { row: usize, value: String },

    #[error("row {row}: '{value}' is not a finite tau value")]
    Tau { row: usize, value: String },

    #[error("row {row}: timestamp {timestamp} precedes the previous row ({previous})")]
    OutOfOrder {
        row: usize,
        timestamp: NaiveDateTime,
        previous: NaiveDateTime,
    },

    #[error("source contains no samples")]
    Empty,
}

/// Crate-level error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load tau series: {0}")]
    Load(#[from] LoadError),

    #[error("period is not valid: {from} is after {to}")]
    InvalidRange {
        from: NaiveDateTime,
        to: NaiveDateTime,
    },

    #[error("granularity '{0}' is not supported (expected yr, mn, dy, ng, hr or mt)")]
    UnsupportedGranularity(String),

    #[error("step value '{0}' is not valid")]
    InvalidStep(String),

    #[error("cannot aggregate an empty selection")]
    EmptySelection,
}
