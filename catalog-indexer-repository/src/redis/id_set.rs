//! Impacted-id set backed by a Redis set.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::IdSetError;
use crate::interfaces::IdSetStore;
use catalog_indexer_shared::WorkId;

/// Id set store using `SADD`, `SSCAN` and `DEL`.
///
/// The connection manager reconnects on its own after a dropped connection;
/// the command that observed the drop still fails and is retried by the caller.
#[derive(Clone)]
pub struct RedisIdSetStore {
    conn: ConnectionManager,
}

impl RedisIdSetStore {
    /// Connect to Redis at the given URL (e.g. `redis://localhost:6379/0`).
    pub async fn new(url: &str) -> Result<Self, IdSetError> {
        let client = redis::Client::open(url).map_err(|e| IdSetError::connection(e.to_string()))?;
        let conn = ConnectionManager::new(client).await?;

        info!(url = %url, "Connected to Redis id set store");

        Ok(Self { conn })
    }
}

#[async_trait]
impl IdSetStore for RedisIdSetStore {
    async fn add(&self, key: &str, ids: &[WorkId]) -> Result<(), IdSetError> {
        if ids.is_empty() {
            return Ok(());
        }

        let members: Vec<String> = ids.iter().map(Uuid::to_string).collect();
        let mut conn = self.conn.clone();
        let added: usize = conn.sadd(key, members).await?;

        debug!(key = %key, offered = ids.len(), added = added, "Added ids to set");
        Ok(())
    }

    async fn scan(
        &self,
        key: &str,
        cursor: u64,
        count: usize,
    ) -> Result<(u64, Vec<WorkId>), IdSetError> {
        let mut conn = self.conn.clone();
        let (next, members): (u64, Vec<String>) = redis::cmd("SSCAN")
            .arg(key)
            .arg(cursor)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        let ids = members
            .iter()
            .map(|member| {
                Uuid::parse_str(member)
                    .map_err(|e| IdSetError::decode(format!("Invalid work id {:?}: {}", member, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((next, ids))
    }

    async fn clear(&self, key: &str) -> Result<(), IdSetError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;

        debug!(key = %key, "Cleared id set");
        Ok(())
    }
}
