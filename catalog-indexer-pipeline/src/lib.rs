//! # Catalog Indexer Pipeline
//!
//! This crate keeps the search indices in step with the relational catalog.
//!
//! ## Architecture
//!
//! One sync pass runs these components in order:
//!
//! 1. **Extractor**: Pages rows changed since the checkpoint out of the catalog
//! 2. **Loader**: Upserts changed genres and people directly
//! 3. **Extractor** (impact): Maps changed rows to the works that reference them
//! 4. **Aggregator**: Collects impacted work ids in an external set
//! 5. **Assembler**: Folds join rows into work documents, chunk by chunk
//! 6. **Loader**: Upserts the work documents
//! 7. **Checkpoint**: Advances once everything above succeeded
//!
//! The **Orchestrator** repeats passes until shut down.

pub mod aggregator;
pub mod assembler;
pub mod checkpoint;
pub mod errors;
pub mod extractor;
pub mod loader;
pub mod orchestrator;
pub mod retry;

#[cfg(test)]
mod testing;

pub use errors::PipelineError;
