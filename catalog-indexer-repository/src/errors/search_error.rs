//! Search error types.
//!
//! This module defines the error types that can occur during search engine operations.

use thiserror::Error;

/// Errors that can occur during search engine operations.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Failed to reach the search engine.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The search engine answered but is overloaded or failing (429, 5xx).
    #[error("Search engine unavailable: {0}")]
    UnavailableError(String),

    /// A request was rejected by the search engine.
    #[error("Query error: {0}")]
    QueryError(String),

    /// Bulk request was accepted but some documents were rejected.
    #[error("Bulk index error: {0}")]
    BulkIndexError(String),

    /// Failed to create a search index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to parse a response from the search engine.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize a document for the search engine.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SearchError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::UnavailableError(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create a bulk index error.
    pub fn bulk_index(msg: impl Into<String>) -> Self {
        Self::BulkIndexError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Map a non-success HTTP status to an error.
    ///
    /// 429 and 5xx are reported as [`SearchError::UnavailableError`]; anything
    /// else goes through `otherwise`.
    pub fn from_status(
        status: u16,
        body: &str,
        otherwise: impl FnOnce(String) -> SearchError,
    ) -> Self {
        let msg = format!("status {}: {}", status, body);
        if status == 429 || status >= 500 {
            Self::UnavailableError(msg)
        } else {
            otherwise(msg)
        }
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Rejected bulk items are not transient: the request reached the engine
    /// and the pass must fail rather than loop on the same documents.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionError(_) | Self::UnavailableError(_))
    }
}
