//! Fire-and-forget cache persistence.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use super::{cache_key, CacheKind, LocalCacheStore};
use crate::models::{ActivityRecord, Entry, UserId};
use crate::tasks::BackgroundTasks;

/// Writes snapshots in the background.
///
/// Each write is stamped with a sequence number when it is requested. Writes
/// run one at a time, and a write older than the last one committed for the
/// same key is skipped, so a slow early write can never clobber a later one.
pub struct CacheWriter {
    store: Arc<dyn LocalCacheStore>,
    page_limit: usize,
    sequence: AtomicU64,
    committed: Arc<Mutex<HashMap<String, u64>>>,
}

impl CacheWriter {
    pub fn new(store: Arc<dyn LocalCacheStore>, page_limit: usize) -> Self {
        Self {
            store,
            page_limit,
            sequence: AtomicU64::new(0),
            committed: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The underlying store (reads bypass the writer).
    pub fn store(&self) -> &Arc<dyn LocalCacheStore> {
        &self.store
    }

    /// Persist the first page of `entries` for `user`.
    pub fn persist_entries(&self, tasks: &BackgroundTasks, user: &UserId, entries: &[Entry]) {
        let first_page: Vec<Entry> = entries.iter().take(self.page_limit).cloned().collect();
        let key = cache_key(CacheKind::Entries, user);
        let sequence = self.next_sequence();
        let store = Arc::clone(&self.store);
        let committed = Arc::clone(&self.committed);
        let user = user.clone();

        tasks.spawn("cache entries write", async move {
            let mut committed = committed.lock().await;
            if committed.get(&key).is_some_and(|last| *last > sequence) {
                tracing::debug!("Skipping stale cache write for {}", key);
                return Ok(());
            }
            store.set_entries(&user, &first_page).await?;
            committed.insert(key, sequence);
            Ok(())
        });
    }

    /// Persist the full metadata list for `user`.
    pub fn persist_metadata(
        &self,
        tasks: &BackgroundTasks,
        user: &UserId,
        metadata: &[ActivityRecord],
    ) {
        let metadata = metadata.to_vec();
        let key = cache_key(CacheKind::Metadata, user);
        let sequence = self.next_sequence();
        let store = Arc::clone(&self.store);
        let committed = Arc::clone(&self.committed);
        let user = user.clone();

        tasks.spawn("cache metadata write", async move {
            let mut committed = committed.lock().await;
            if committed.get(&key).is_some_and(|last| *last > sequence) {
                tracing::debug!("Skipping stale cache write for {}", key);
                return Ok(());
            }
            store.set_metadata(&user, &metadata).await?;
            committed.insert(key, sequence);
            Ok(())
        });
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }
}
