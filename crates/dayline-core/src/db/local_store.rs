//! libSQL-backed local cache and marker store

use std::sync::Arc;

use async_trait::async_trait;
use libsql::params;

use super::Database;
use crate::cache::{
    cache_key, snapshot_from_parts, CacheKind, CacheSnapshot, LocalCacheStore, MergeMarkerStore,
    PENDING_MERGE_KEY,
};
use crate::error::Result;
use crate::models::{ActivityRecord, Entry, PendingMerge, UserId};
use crate::util::unix_millis_now;

/// Namespaced key-value store on a local libSQL database
#[derive(Clone)]
pub struct LibSqlLocalStore {
    db: Arc<Database>,
}

impl LibSqlLocalStore {
    pub const fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Read a raw value
    pub async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .db
            .connection()
            .query("SELECT value FROM kv_store WHERE key = ?", [key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Insert or replace a raw value
    pub async fn set_value(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .connection()
            .execute(
                "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)",
                params![key, value, unix_millis_now()],
            )
            .await?;
        Ok(())
    }

    /// Remove a value; removing a missing key is not an error
    pub async fn remove_value(&self, key: &str) -> Result<()> {
        self.db
            .connection()
            .execute("DELETE FROM kv_store WHERE key = ?", [key])
            .await?;
        Ok(())
    }
}

#[async_trait]
impl LocalCacheStore for LibSqlLocalStore {
    async fn get(&self, user: &UserId) -> Result<Option<CacheSnapshot>> {
        let entries = self.get_value(&cache_key(CacheKind::Entries, user)).await?;
        let metadata = self.get_value(&cache_key(CacheKind::Metadata, user)).await?;
        snapshot_from_parts(entries.as_deref(), metadata.as_deref())
    }

    async fn set_entries(&self, user: &UserId, entries: &[Entry]) -> Result<()> {
        let value = serde_json::to_string(entries)?;
        self.set_value(&cache_key(CacheKind::Entries, user), &value)
            .await
    }

    async fn set_metadata(&self, user: &UserId, metadata: &[ActivityRecord]) -> Result<()> {
        let value = serde_json::to_string(metadata)?;
        self.set_value(&cache_key(CacheKind::Metadata, user), &value)
            .await
    }
}

#[async_trait]
impl MergeMarkerStore for LibSqlLocalStore {
    async fn load_marker(&self) -> Result<Option<PendingMerge>> {
        match self.get_value(PENDING_MERGE_KEY).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save_marker(&self, marker: &PendingMerge) -> Result<()> {
        let value = serde_json::to_string(marker)?;
        self.set_value(PENDING_MERGE_KEY, &value).await
    }

    async fn clear_marker(&self) -> Result<()> {
        self.remove_value(PENDING_MERGE_KEY).await
    }
}
