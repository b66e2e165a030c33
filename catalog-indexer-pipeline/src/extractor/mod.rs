//! Change extractor.
//!
//! Pages rows modified after the checkpoint out of the catalog, one table
//! after another, and maps them to the works whose documents they affect.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::errors::PipelineError;
use crate::retry::Backoff;
use catalog_indexer_repository::SourceStore;
use catalog_indexer_shared::{ChangeBatch, PageCursor, SourceTable, WorkId};

/// Default number of rows per page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Result of polling the catalog for changes.
pub enum Poll {
    /// At least one table has rows modified after the checkpoint.
    Updates(ChangeStream),
    /// Nothing changed; the pass can finish without touching the checkpoint.
    NoUpdates,
}

impl std::fmt::Debug for Poll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Poll::Updates(_) => f.write_str("Updates"),
            Poll::NoUpdates => f.write_str("NoUpdates"),
        }
    }
}

/// Extracts changed rows from the relational catalog.
pub struct ChangeExtractor {
    source: Arc<dyn SourceStore>,
    backoff: Backoff,
    page_size: usize,
}

impl ChangeExtractor {
    pub fn new(source: Arc<dyn SourceStore>, backoff: Backoff) -> Self {
        Self {
            source,
            backoff,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the number of rows fetched per page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Look for rows modified after `since` in every table.
    ///
    /// The first page of each table is fetched up front. If all of them are
    /// empty, [`Poll::NoUpdates`] is returned.
    #[instrument(skip(self), fields(since = %since.to_rfc3339()))]
    pub async fn poll_changes(&self, since: DateTime<Utc>) -> Result<Poll, PipelineError> {
        let mut feeds = VecDeque::with_capacity(SourceTable::ALL.len());

        for table in SourceTable::ALL {
            let cursor = PageCursor::after(since);
            let first =
                fetch_page(&self.source, &self.backoff, table, cursor, self.page_size).await?;
            debug!(table = %table, rows = first.len(), "Fetched first change page");
            feeds.push_back(TableFeed {
                table,
                cursor,
                buffered: Some(first),
                exhausted: false,
            });
        }

        if feeds
            .iter()
            .all(|feed| feed.buffered.as_ref().map_or(true, ChangeBatch::is_empty))
        {
            return Ok(Poll::NoUpdates);
        }

        info!("Changes found since last checkpoint");

        Ok(Poll::Updates(ChangeStream {
            source: self.source.clone(),
            backoff: self.backoff,
            page_size: self.page_size,
            feeds,
        }))
    }

    /// Ids of the works affected by a batch of changed rows.
    ///
    /// Work batches map to their own ids. Person and genre batches follow the
    /// join tables. The result may contain duplicates.
    pub async fn resolve_impact(&self, batch: &ChangeBatch) -> Result<Vec<WorkId>, PipelineError> {
        let table = batch.table();
        let ids = batch.ids();

        if let ChangeBatch::Works(_) = batch {
            return Ok(ids);
        }
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let operation = format!("impacted_work_ids:{}", table);
        let work_ids = self
            .backoff
            .retry(&operation, || self.source.impacted_work_ids(table, &ids))
            .await?;

        debug!(
            table = %table,
            changed = ids.len(),
            impacted = work_ids.len(),
            "Resolved impacted works"
        );

        Ok(work_ids)
    }
}

struct TableFeed {
    table: SourceTable,
    cursor: PageCursor,
    buffered: Option<ChangeBatch>,
    exhausted: bool,
}

/// Lazily paged change batches of one pass.
///
/// Tables are yielded in the order `work`, `person`, `genre`; within a table
/// batches follow `(modified, id)` order.
pub struct ChangeStream {
    source: Arc<dyn SourceStore>,
    backoff: Backoff,
    page_size: usize,
    feeds: VecDeque<TableFeed>,
}

impl ChangeStream {
    /// The next non-empty batch, or `None` once every table is exhausted.
    pub async fn next_batch(&mut self) -> Result<Option<ChangeBatch>, PipelineError> {
        loop {
            let Some(feed) = self.feeds.front_mut() else {
                return Ok(None);
            };

            if let Some(batch) = feed.buffered.take() {
                if batch.is_empty() {
                    self.feeds.pop_front();
                    continue;
                }

                // A short page means nothing is left after it.
                if batch.len() < self.page_size {
                    feed.exhausted = true;
                }
                if let Some(cursor) = batch.last_cursor() {
                    feed.cursor = cursor;
                }
                return Ok(Some(batch));
            }

            if feed.exhausted {
                self.feeds.pop_front();
                continue;
            }

            let batch =
                fetch_page(&self.source, &self.backoff, feed.table, feed.cursor, self.page_size)
                    .await?;
            feed.buffered = Some(batch);
        }
    }
}

async fn fetch_page(
    source: &Arc<dyn SourceStore>,
    backoff: &Backoff,
    table: SourceTable,
    cursor: PageCursor,
    limit: usize,
) -> Result<ChangeBatch, PipelineError> {
    let operation = format!("fetch_changes:{}", table);
    let batch = backoff
        .retry(&operation, || source.fetch_changes(table, cursor, limit))
        .await?;
    Ok(batch)
}
