use std::path::PathBuf;
use thiserror::Error;

use crate::models::MonthKey;

/// All errors produced by the message archive engine.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The archive holds no messages, so it has no earliest/latest message
    /// and no age.
    #[error("Archive contains no messages")]
    EmptyArchive,

    /// A raw record was missing a field every message must carry.
    #[error("Message is missing required field: {0}")]
    MissingField(&'static str),

    /// A send date string did not match any recognised format.
    #[error("Invalid timestamp format: {0}")]
    InvalidTimestamp(String),

    /// A message landed outside the bucket range computed for its archive.
    ///
    /// This can only come from broken month arithmetic, never from input data.
    #[error("Message month {month} falls outside the bucket range starting at {start}")]
    BucketOutOfRange { month: MonthKey, start: MonthKey },

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the msgviz crates.
pub type Result<T> = std::result::Result<T, ArchiveError>;
