//! Local cache store.
//!
//! A per-user durable mirror of the coordinator's in-memory state, read once
//! when a session binds so the UI can show something before the network
//! answers. Keys are namespaced by user id so switching identities never
//! exposes another identity's entries. Only the first page of entries is
//! kept; the metadata list is kept whole.

mod memory;
mod writer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{ActivityRecord, Entry, PendingMerge, UserId};

pub use memory::MemoryStore;
pub use writer::CacheWriter;

/// Key holding the single pending-merge slot
pub const PENDING_MERGE_KEY: &str = "pending_merge";

/// Cached state for one user, both sequences newest-first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub entries: Vec<Entry>,
    pub metadata: Vec<ActivityRecord>,
}

impl CacheSnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.metadata.is_empty()
    }
}

/// Which half of a snapshot a key addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Entries,
    Metadata,
}

/// Namespaced key for one half of a user's snapshot.
pub fn cache_key(kind: CacheKind, user: &UserId) -> String {
    match kind {
        CacheKind::Entries => format!("entries:{user}"),
        CacheKind::Metadata => format!("metadata:{user}"),
    }
}

/// Per-user snapshot persistence
#[async_trait]
pub trait LocalCacheStore: Send + Sync {
    /// Load the snapshot for `user`, `None` when nothing was ever written
    async fn get(&self, user: &UserId) -> Result<Option<CacheSnapshot>>;

    async fn set_entries(&self, user: &UserId, entries: &[Entry]) -> Result<()>;

    async fn set_metadata(&self, user: &UserId, metadata: &[ActivityRecord]) -> Result<()>;
}

/// Durable single-slot pending-merge marker that survives restarts
#[async_trait]
pub trait MergeMarkerStore: Send + Sync {
    async fn load_marker(&self) -> Result<Option<PendingMerge>>;

    async fn save_marker(&self, marker: &PendingMerge) -> Result<()>;

    async fn clear_marker(&self) -> Result<()>;
}

/// Assemble a snapshot from the raw JSON stored under both keys.
pub(crate) fn snapshot_from_parts(
    entries: Option<&str>,
    metadata: Option<&str>,
) -> Result<Option<CacheSnapshot>> {
    if entries.is_none() && metadata.is_none() {
        return Ok(None);
    }
    let entries = entries
        .map(serde_json::from_str::<Vec<Entry>>)
        .transpose()?
        .unwrap_or_default();
    let metadata = metadata
        .map(serde_json::from_str::<Vec<ActivityRecord>>)
        .transpose()?
        .unwrap_or_default();
    Ok(Some(CacheSnapshot { entries, metadata }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_keys_are_namespaced_per_user() {
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        assert_ne!(
            cache_key(CacheKind::Entries, &alice),
            cache_key(CacheKind::Entries, &bob)
        );
        assert_ne!(
            cache_key(CacheKind::Entries, &alice),
            cache_key(CacheKind::Metadata, &alice)
        );
    }

    #[test]
    fn test_snapshot_requires_at_least_one_part() {
        assert_eq!(snapshot_from_parts(None, None).unwrap(), None);

        let snapshot = snapshot_from_parts(None, Some("[]")).unwrap().unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_snapshot_rejects_corrupt_json() {
        assert!(snapshot_from_parts(Some("{not json"), None).is_err());
    }
}
