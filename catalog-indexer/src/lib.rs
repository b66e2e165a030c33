//! # Catalog Indexer
//!
//! Keeps the `movies`, `genres` and `persons` search indices in step with
//! the relational film catalog.
//!
//! This crate provides the entry point and configuration for running
//! the sync pipeline.

pub mod config;

pub use config::{Dependencies, SyncSettings};

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] catalog_indexer_pipeline::PipelineError),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] catalog_indexer_repository::SearchError),

    /// Catalog database error.
    #[error("Source error: {0}")]
    SourceError(#[from] catalog_indexer_repository::SourceError),

    /// Impacted id set error.
    #[error("Id set error: {0}")]
    IdSetError(#[from] catalog_indexer_repository::IdSetError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
