use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown hash algorithm '{0}' (expected md5, sha1, sha256, blake3 or xxh64)")]
    UnknownHashAlgorithm(String),

    #[error("Cannot access scan root {}: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot read {}: {source}", path.display())]
    ObjectUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Archive listing tool not found: {tool}")]
    ListingToolMissing { tool: String },

    #[error("Archive listing failed for {} ({status})", archive.display())]
    ListingToolFailed {
        archive: PathBuf,
        status: ExitStatus,
        output: String,
    },

    #[error("Archive listing for {} timed out after {}s", archive.display(), timeout.as_secs())]
    ListingTimeout { archive: PathBuf, timeout: Duration },

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
