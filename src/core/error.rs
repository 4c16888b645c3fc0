//! Error types for the record system
//!
//! This module defines all error types that can occur during database operations.

use super::value::Value;

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Error types for database operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Connection or pool error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement execution error, annotated with the offending SQL and bindings
    #[error("Statement failed: {source}\n  statement: {statement}\n  bindings: {bindings:?}")]
    Statement {
        statement: String,
        bindings: Vec<Value>,
        #[source]
        source: mysql_async::Error,
    },

    /// Transaction lifecycle error (e.g. use after commit/rollback)
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Value validation error, raised before any I/O is attempted
    #[error("Validation error: {0}")]
    Validation(String),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// MySQL driver error
    #[error("MySQL error: {0}")]
    Driver(#[from] mysql_async::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl DatabaseError {
    /// Create a new connection error
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        DatabaseError::Connection(msg.into())
    }

    /// Create a statement error carrying the SQL text and its bindings
    pub fn statement(
        statement: impl Into<String>,
        bindings: Vec<Value>,
        source: mysql_async::Error,
    ) -> Self {
        DatabaseError::Statement {
            statement: statement.into(),
            bindings,
            source,
        }
    }

    /// Create a new transaction error
    pub fn transaction<S: Into<String>>(msg: S) -> Self {
        DatabaseError::Transaction(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        DatabaseError::Validation(msg.into())
    }

    /// Create a new migration error
    pub fn migration<S: Into<String>>(msg: S) -> Self {
        DatabaseError::Migration(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        DatabaseError::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = DatabaseError::connection("pool exhausted");
        assert!(matches!(err, DatabaseError::Connection(_)));

        let err = DatabaseError::validation("bad point");
        assert!(matches!(err, DatabaseError::Validation(_)));

        let err = DatabaseError::migration("missing directory");
        assert!(matches!(err, DatabaseError::Migration(_)));
    }

    #[test]
    fn test_error_display() {
        let err = DatabaseError::connection("connection refused");
        assert_eq!(err.to_string(), "Connection error: connection refused");

        let err = DatabaseError::transaction("transaction already finished");
        assert_eq!(
            err.to_string(),
            "Transaction error: transaction already finished"
        );
    }
}
