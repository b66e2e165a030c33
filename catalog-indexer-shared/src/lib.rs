//! # Catalog Indexer Shared
//!
//! Shared types for the catalog indexer: rows read from the relational
//! source and the documents written to the search index.

pub mod documents;
pub mod source;

pub use documents::{GenreDocument, PersonDocument, PersonRef, WorkDocument};
pub use source::{
    ChangeBatch, ChangedGenre, ChangedPerson, ChangedWork, PageCursor, Role, SourceTable, WorkId,
    WorkRow,
};
