//! Error types for the catalog indexer repository.

mod id_set_error;
mod search_error;
mod source_error;

pub use id_set_error::IdSetError;
pub use search_error::SearchError;
pub use source_error::SourceError;
