//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`scylla`] driver errors with additional context about which operation
//! failed.

use scylla::errors::{
    DbError as ServerError, DeserializationError, ExecutionError, IntoRowsResultError,
    NewSessionError, PrepareError, RequestAttemptError, RowsError, TracingError,
};

use crate::consistency::ConsistencyLevel;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// No contact point could be reached.
    #[error("Cassandra connection error: {0}")]
    Connect(#[from] NewSessionError),

    /// A statement could not be prepared.
    #[error("Cassandra prepare error: {0}")]
    Prepare(#[from] PrepareError),

    /// A statement failed to execute (including consistency not achieved).
    #[error("Cassandra execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// A statement that should return rows did not.
    #[error("Cassandra result error: {0}")]
    IntoRows(#[from] IntoRowsResultError),

    /// The returned rows do not match the expected column types.
    #[error("Cassandra row type error: {0}")]
    Rows(#[from] RowsError),

    /// A returned row could not be decoded.
    #[error("Cassandra row decode error: {0}")]
    Deserialization(#[from] DeserializationError),

    /// The execution trace of a statement could not be fetched.
    #[error("Cassandra tracing error: {0}")]
    Tracing(#[from] TracingError),

    /// A row was decoded but holds a value outside the data model.
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// Not enough replicas answered to satisfy the requested consistency.
    #[error("{operation} unavailable at consistency {required}")]
    Unavailable {
        /// The operation that failed.
        operation: String,
        /// The consistency level that could not be met.
        required: ConsistencyLevel,
    },

    /// The position table has not been created yet.
    #[error("Table {table} does not exist")]
    SchemaMissing {
        /// Fully qualified table name.
        table: String,
    },

    /// A trace could not be handed to the trace sink.
    #[error("Trace sink error: {0}")]
    TraceSink(#[from] std::io::Error),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Whether re-issuing the same statement may succeed without side effects.
    ///
    /// Failures that reject a statement before any replica applies it
    /// (unavailable, overloaded, bootstrapping, no connection) always
    /// qualify. Timeouts and dropped connections leave the outcome unknown,
    /// so they qualify only when `idempotent` is set: a repeated insert that
    /// lets the server pick `now()` would add a second row. Schema, syntax,
    /// decoding and configuration errors never qualify.
    pub fn is_retryable(&self, idempotent: bool) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::Execution(error) => execution_retryable(error, idempotent),
            _ => false,
        }
    }
}

fn execution_retryable(error: &ExecutionError, idempotent: bool) -> bool {
    match error {
        ExecutionError::ConnectionPoolError(_) => true,
        ExecutionError::RequestTimeout(_) => idempotent,
        ExecutionError::LastAttemptError(attempt) => attempt_retryable(attempt, idempotent),
        _ => false,
    }
}

fn attempt_retryable(error: &RequestAttemptError, idempotent: bool) -> bool {
    match error {
        RequestAttemptError::BrokenConnectionError(_) => idempotent,
        RequestAttemptError::DbError(server, _) => match server {
            ServerError::Unavailable { .. } | ServerError::Overloaded | ServerError::IsBootstrapping => {
                true
            }
            ServerError::ReadTimeout { .. } | ServerError::WriteTimeout { .. } => idempotent,
            _ => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use scylla::errors::WriteType;
    use scylla::statement::Consistency;

    use super::*;

    fn server(error: ServerError) -> DbError {
        DbError::Execution(ExecutionError::LastAttemptError(RequestAttemptError::DbError(
            error,
            String::from("server message"),
        )))
    }

    #[test]
    fn local_failures_follow_replica_availability() {
        let unavailable = DbError::Unavailable {
            operation: String::from("insert"),
            required: ConsistencyLevel::Quorum,
        };
        assert!(unavailable.is_retryable(false));
        assert_eq!(unavailable.to_string(), "insert unavailable at consistency QUORUM");

        let missing = DbError::SchemaMissing {
            table: String::from("birds.bird_positions"),
        };
        assert!(!missing.is_retryable(true));
        assert!(!DbError::Config(String::from("bad")).is_retryable(true));
    }

    #[test]
    fn rejected_before_apply_is_retryable() {
        let unavailable = server(ServerError::Unavailable {
            consistency: Consistency::Quorum,
            required: 2,
            alive: 1,
        });
        assert!(unavailable.is_retryable(false));
        assert!(server(ServerError::Overloaded).is_retryable(false));
        assert!(server(ServerError::IsBootstrapping).is_retryable(false));
    }

    #[test]
    fn permanent_server_errors_are_not_retryable() {
        assert!(!server(ServerError::Invalid).is_retryable(true));
        assert!(!server(ServerError::SyntaxError).is_retryable(true));
        assert!(!server(ServerError::Unauthorized).is_retryable(true));
    }

    #[test]
    fn unknown_outcome_needs_idempotent_statement() {
        let write_timeout = server(ServerError::WriteTimeout {
            consistency: Consistency::Quorum,
            received: 1,
            required: 2,
            write_type: WriteType::Simple,
        });
        assert!(!write_timeout.is_retryable(false));
        assert!(write_timeout.is_retryable(true));

        let client_timeout = DbError::Execution(ExecutionError::RequestTimeout(Duration::from_secs(12)));
        assert!(!client_timeout.is_retryable(false));
        assert!(client_timeout.is_retryable(true));
    }
}
