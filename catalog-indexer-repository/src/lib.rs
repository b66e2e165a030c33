//! # Catalog Indexer Repository
//!
//! This crate provides the traits the sync pipeline talks to and their
//! concrete implementations:
//!
//! - [`SourceStore`]: the relational catalog (PostgreSQL)
//! - [`IdSetStore`]: the set of impacted work ids (Redis)
//! - [`SearchEngineClient`]: the search index (OpenSearch)

pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod postgres;
pub mod redis;

pub use errors::{IdSetError, SearchError, SourceError};
pub use interfaces::{BulkDocument, IdSetStore, SearchEngineClient, SourceStore};
pub use crate::opensearch::{catalog_indices, IndexDefinition, OpenSearchClient};
pub use crate::postgres::PostgresSource;
pub use crate::redis::RedisIdSetStore;
