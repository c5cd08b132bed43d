//! Error type for the tracker process.

use birdtrack_core::{ConfigError, CoreError};
use birdtrack_db::DbError;

/// Errors that stop the tracker. Any of them exits the process non-zero.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Configuration is missing or invalid.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// Connecting to the cluster failed.
    #[error("storage error: {source}")]
    Db {
        /// The underlying storage error.
        #[from]
        source: DbError,
    },

    /// A log file could not be created.
    #[error("log file error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The tracking loop failed.
    #[error("tracking error: {source}")]
    Run {
        /// The underlying loop error.
        #[from]
        source: CoreError,
    },
}
