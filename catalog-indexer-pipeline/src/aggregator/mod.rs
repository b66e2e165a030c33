//! Impacted work id aggregation.
//!
//! Ids resolved from every change batch are collected in an external set so
//! a pass does not hold them in memory, then drained in chunks for assembly.

use std::collections::HashSet;
use std::sync::Arc;

use futures::{stream, Stream, TryStreamExt};
use tracing::{debug, info};

use crate::errors::PipelineError;
use crate::retry::Backoff;
use catalog_indexer_repository::IdSetStore;
use catalog_indexer_shared::WorkId;

/// Default key of the impacted id set.
pub const DEFAULT_ID_SET_KEY: &str = "work_ids";

/// Collects impacted work ids across the batches of one pass.
pub struct IdAggregator {
    store: Arc<dyn IdSetStore>,
    backoff: Backoff,
    key: String,
}

impl IdAggregator {
    pub fn new(store: Arc<dyn IdSetStore>, backoff: Backoff) -> Self {
        Self {
            store,
            backoff,
            key: DEFAULT_ID_SET_KEY.to_string(),
        }
    }

    /// Use a different set key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Drop whatever a previous, failed pass left behind.
    pub async fn reset(&self) -> Result<(), PipelineError> {
        debug!(key = %self.key, "Resetting impacted id set");
        self.clear().await
    }

    /// Add ids to the set. Adding an id twice has no effect.
    pub async fn add(&self, ids: &[WorkId]) -> Result<(), PipelineError> {
        if ids.is_empty() {
            return Ok(());
        }

        self.backoff
            .retry("sadd", || self.store.add(&self.key, ids))
            .await?;

        debug!(key = %self.key, count = ids.len(), "Added impacted ids");
        Ok(())
    }

    /// Delete the set.
    pub async fn clear(&self) -> Result<(), PipelineError> {
        self.backoff
            .retry("del", || self.store.clear(&self.key))
            .await?;
        Ok(())
    }

    /// Stream the set in chunks of at most `chunk_size` ids.
    ///
    /// Only the scan cursor is kept between pages, so memory stays bounded by
    /// one scan reply. Every member present for the whole drain is yielded at
    /// least once. A chunk never repeats an id, but a rehash during the scan
    /// can return an id again in a later chunk. The set is left intact, call
    /// [`IdAggregator::clear`] once all chunks were handled.
    pub fn drain(
        &self,
        chunk_size: usize,
    ) -> impl Stream<Item = Result<Vec<WorkId>, PipelineError>> + Send + '_ {
        let chunk_size = chunk_size.max(1);

        stream::try_unfold((Some(0u64), 0usize), move |(cursor, scanned)| async move {
            let Some(cursor) = cursor else {
                return Ok(None);
            };

            let (next, mut ids) = self
                .backoff
                .retry("sscan", || self.store.scan(&self.key, cursor, chunk_size))
                .await?;

            let mut page = HashSet::with_capacity(ids.len());
            ids.retain(|id| page.insert(*id));

            let scanned = scanned + ids.len();
            if next == 0 {
                info!(key = %self.key, scanned, "Drained impacted id set");
            }

            // COUNT is a hint; small sets come back whole.
            let chunks: Vec<Result<Vec<WorkId>, PipelineError>> =
                ids.chunks(chunk_size).map(|chunk| Ok(chunk.to_vec())).collect();

            let next = (next != 0).then_some(next);
            Ok::<_, PipelineError>(Some((stream::iter(chunks), (next, scanned))))
        })
        .try_flatten()
    }
}
