//! Relational source store trait definition.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::SourceError;
use catalog_indexer_shared::{ChangeBatch, PageCursor, SourceTable, WorkId, WorkRow};

/// Read-only access to the relational catalog.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Fetch one page of rows changed after `cursor`, ordered by
    /// `(modified, id)` ascending.
    ///
    /// # Arguments
    ///
    /// * `table` - The table to read
    /// * `cursor` - Position after which rows are returned
    /// * `limit` - Maximum number of rows in the page
    ///
    /// # Returns
    ///
    /// * `Ok(ChangeBatch)` - A batch for `table`; empty when the feed is exhausted
    /// * `Err(SourceError)` - If the query fails
    async fn fetch_changes(
        &self,
        table: SourceTable,
        cursor: PageCursor,
        limit: usize,
    ) -> Result<ChangeBatch, SourceError>;

    /// Ids of the works that reference any of the given rows.
    ///
    /// For `person` and `genre` this follows the join table; for `work` the
    /// ids are returned unchanged. The result may contain duplicates.
    async fn impacted_work_ids(
        &self,
        table: SourceTable,
        ids: &[Uuid],
    ) -> Result<Vec<WorkId>, SourceError>;

    /// Flattened join rows for the given works.
    ///
    /// Works that no longer exist produce no rows.
    async fn work_rows(&self, work_ids: &[WorkId]) -> Result<Vec<WorkRow>, SourceError>;
}
