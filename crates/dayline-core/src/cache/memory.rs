//! In-memory cache and marker store (tests and ephemeral sessions).

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    cache_key, snapshot_from_parts, CacheKind, CacheSnapshot, LocalCacheStore, MergeMarkerStore,
    PENDING_MERGE_KEY,
};
use crate::error::Result;
use crate::models::{ActivityRecord, Entry, PendingMerge, UserId};

/// Key-value store held in process memory. Values are stored as JSON so the
/// behaviour matches the libSQL-backed store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value for a key, if any.
    pub async fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().await.get(key).cloned()
    }

    async fn put(&self, key: String, value: String) {
        self.values.lock().await.insert(key, value);
    }
}

#[async_trait]
impl LocalCacheStore for MemoryStore {
    async fn get(&self, user: &UserId) -> Result<Option<CacheSnapshot>> {
        let values = self.values.lock().await;
        snapshot_from_parts(
            values
                .get(&cache_key(CacheKind::Entries, user))
                .map(String::as_str),
            values
                .get(&cache_key(CacheKind::Metadata, user))
                .map(String::as_str),
        )
    }

    async fn set_entries(&self, user: &UserId, entries: &[Entry]) -> Result<()> {
        let value = serde_json::to_string(entries)?;
        self.put(cache_key(CacheKind::Entries, user), value).await;
        Ok(())
    }

    async fn set_metadata(&self, user: &UserId, metadata: &[ActivityRecord]) -> Result<()> {
        let value = serde_json::to_string(metadata)?;
        self.put(cache_key(CacheKind::Metadata, user), value).await;
        Ok(())
    }
}

#[async_trait]
impl MergeMarkerStore for MemoryStore {
    async fn load_marker(&self) -> Result<Option<PendingMerge>> {
        self.raw(PENDING_MERGE_KEY)
            .await
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(Into::into)
    }

    async fn save_marker(&self, marker: &PendingMerge) -> Result<()> {
        let value = serde_json::to_string(marker)?;
        self.put(PENDING_MERGE_KEY.to_string(), value).await;
        Ok(())
    }

    async fn clear_marker(&self) -> Result<()> {
        self.values.lock().await.remove(PENDING_MERGE_KEY);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryId;

    fn record(created_at: i64) -> ActivityRecord {
        ActivityRecord {
            id: EntryId::new(),
            created_at,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_snapshots_do_not_leak_between_users() {
        let store = MemoryStore::new();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        store.set_metadata(&alice, &[record(2), record(1)]).await.unwrap();

        let snapshot = store.get(&alice).await.unwrap().unwrap();
        assert_eq!(snapshot.metadata.len(), 2);
        assert!(snapshot.entries.is_empty());
        assert!(store.get(&bob).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_marker_roundtrip_and_clear() {
        let store = MemoryStore::new();
        assert!(store.load_marker().await.unwrap().is_none());

        let marker = PendingMerge {
            source_user_id: UserId::new("anon"),
            created_at: 42,
        };
        store.save_marker(&marker).await.unwrap();
        assert_eq!(store.load_marker().await.unwrap(), Some(marker));

        store.clear_marker().await.unwrap();
        assert!(store.load_marker().await.unwrap().is_none());
    }
}
