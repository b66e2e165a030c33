//! Interface definitions for the stores the pipeline depends on.
//!
//! Each trait allows for dependency injection and swappable backends, so the
//! pipeline can be exercised against in-memory implementations.

mod id_set_store;
mod search_engine_client;
mod source_store;

pub use id_set_store::IdSetStore;
pub use search_engine_client::{BulkDocument, SearchEngineClient};
pub use source_store::SourceStore;
