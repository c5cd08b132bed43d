//! Error type for the simulator process.

use birdtrack_core::{ConfigError, CoreError};
use birdtrack_db::DbError;

/// Errors that stop the simulator. Any of them exits the process non-zero.
#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    /// Configuration is missing or invalid.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// Connecting or creating the schema failed.
    #[error("storage error: {source}")]
    Db {
        /// The underlying storage error.
        #[from]
        source: DbError,
    },

    /// The trace log could not be created.
    #[error("trace log error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The simulation loop failed.
    #[error("simulation error: {source}")]
    Run {
        /// The underlying loop error.
        #[from]
        source: CoreError,
    },
}
