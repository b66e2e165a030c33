//! Search engine client trait definition.
//!
//! This module defines the abstract interface for search engine operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch, etc.).

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::errors::SearchError;

/// A document ready for a bulk upsert: its id and serialized source.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkDocument {
    /// Document id in the index.
    pub id: String,
    /// Document body.
    pub source: Value,
}

impl BulkDocument {
    /// Serialize a document under the given id.
    pub fn new<T: Serialize>(id: impl Into<String>, document: &T) -> Result<Self, SearchError> {
        let source = serde_json::to_value(document)
            .map_err(|e| SearchError::SerializationError(e.to_string()))?;
        Ok(Self {
            id: id.into(),
            source,
        })
    }
}

/// Abstract interface for search engine operations.
///
/// Implementations can be swapped for different backends (OpenSearch, mock, etc.)
/// enabling easy testing and potential future migrations.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Check whether an index exists.
    async fn index_exists(&self, index: &str) -> Result<bool, SearchError>;

    /// Create an index with the given settings and mappings body.
    ///
    /// Creating an index that already exists is not an error.
    async fn create_index(&self, index: &str, body: &Value) -> Result<(), SearchError>;

    /// Upsert documents into an index in a single bulk request.
    ///
    /// Each document replaces the fields of the stored document with the same
    /// id, or is inserted when absent.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If every document was applied
    /// * `Err(SearchError::BulkIndexError)` - If any document was rejected; the
    ///   accepted ones stay applied
    async fn bulk_upsert(&self, index: &str, documents: &[BulkDocument]) -> Result<(), SearchError>;

    /// Check if the search engine is healthy and reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the search engine is healthy
    /// * `Ok(false)` - If the search engine is unhealthy
    /// * `Err(SearchError)` - If the health check fails to execute
    async fn health_check(&self) -> Result<bool, SearchError>;
}
