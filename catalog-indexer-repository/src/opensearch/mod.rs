//! OpenSearch implementation of the search engine client.
//!
//! This module provides a concrete implementation of `SearchEngineClient`
//! using OpenSearch as the backend, plus the catalog index definitions.

mod bulk;
mod client;
mod index_config;

pub use client::OpenSearchClient;
pub use index_config::{
    catalog_indices, IndexDefinition, GENRES_INDEX, MOVIES_INDEX, PERSONS_INDEX,
};
