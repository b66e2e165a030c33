//! Impacted-id set store trait definition.

use async_trait::async_trait;

use crate::errors::IdSetError;
use catalog_indexer_shared::WorkId;

/// An unordered set of work ids with incremental scanning.
///
/// Modelled on Redis `SADD` / `SSCAN` / `DEL`. Inserts must be idempotent and
/// safe under concurrent callers.
#[async_trait]
pub trait IdSetStore: Send + Sync {
    /// Add ids to the set stored under `key`. Existing members are ignored.
    async fn add(&self, key: &str, ids: &[WorkId]) -> Result<(), IdSetError>;

    /// Scan the set from `cursor`, returning roughly `count` members and the
    /// next cursor. A returned cursor of `0` means the scan is complete.
    ///
    /// A member may be returned more than once during a full scan.
    async fn scan(
        &self,
        key: &str,
        cursor: u64,
        count: usize,
    ) -> Result<(u64, Vec<WorkId>), IdSetError>;

    /// Delete the whole set.
    async fn clear(&self, key: &str) -> Result<(), IdSetError>;
}
