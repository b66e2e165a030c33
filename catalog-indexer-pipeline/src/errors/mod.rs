//! Error types for the catalog indexer pipeline.

use catalog_indexer_repository::{IdSetError, SearchError, SourceError};
use thiserror::Error;

use crate::checkpoint::CheckpointError;

/// Errors that can fail a sync pass.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error from the relational source.
    #[error("Source error: {0}")]
    SourceError(#[from] SourceError),

    /// Error from the impacted-id set store.
    #[error("Id set error: {0}")]
    IdSetError(#[from] IdSetError),

    /// Error from the search engine.
    #[error("Search error: {0}")]
    SearchError(#[from] SearchError),

    /// The checkpoint could not be read or persisted.
    #[error("Checkpoint error: {0}")]
    CheckpointError(#[from] CheckpointError),
}

impl PipelineError {
    /// Whether the error must stop the sync loop instead of failing one pass.
    ///
    /// A checkpoint that cannot be persisted (or read) means every later pass
    /// would start from the wrong place.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CheckpointError(_))
    }
}
