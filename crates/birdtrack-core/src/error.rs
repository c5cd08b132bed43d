//! Error types for the simulation and tracking loops.

use birdtrack_db::DbError;

use crate::config::ConfigError;

/// Errors that end a simulator or tracker run.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A storage operation failed.
    #[error("storage error: {source}")]
    Db {
        /// The underlying storage error.
        #[from]
        source: DbError,
    },

    /// A log file could not be written.
    #[error("log I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A result row could not be serialized.
    #[error("serialization error: {source}")]
    Serialization {
        /// The underlying serde error.
        #[from]
        source: serde_json::Error,
    },

    /// The configuration is invalid.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },
}
