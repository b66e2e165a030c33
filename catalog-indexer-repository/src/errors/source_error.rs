//! Source store error types.

use thiserror::Error;

/// PostgreSQL SQLSTATE classes that mean the connection, not the query, failed.
const TRANSIENT_SQLSTATE_PREFIXES: [&str; 2] = ["08", "57P"];

/// Errors that can occur while reading the relational catalog.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The connection to the database was lost or could not be obtained.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The database rejected a query.
    #[error("Query error: {0}")]
    QueryError(String),

    /// A row could not be decoded into the expected shape.
    #[error("Decode error: {0}")]
    DecodeError(String),
}

impl SourceError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeError(msg.into())
    }

    /// Whether retrying the same query may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionError(_))
    }
}

impl From<sqlx::Error> for SourceError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::ConnectionError(err.to_string()),
            sqlx::Error::Database(db) => {
                let transient = db.code().is_some_and(|code| {
                    TRANSIENT_SQLSTATE_PREFIXES
                        .iter()
                        .any(|prefix| code.starts_with(prefix))
                });
                if transient {
                    Self::ConnectionError(err.to_string())
                } else {
                    Self::QueryError(err.to_string())
                }
            }
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. } => Self::DecodeError(err.to_string()),
            _ => Self::QueryError(err.to_string()),
        }
    }
}
