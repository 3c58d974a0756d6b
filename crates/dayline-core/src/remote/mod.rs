//! Remote repository interface.
//!
//! The remote store is the single source of truth. Its transport and schema
//! are not this crate's concern; [`crate::db::LibSqlJournalRepository`] is one
//! implementation (local libSQL file or Turso embedded replica). Timeouts are
//! the implementation's responsibility.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ActivityRecord, EntryFilter, EntryId, EntryPatch, Profile, RemoteEntry, UserId};

/// Journal storage operations. Every returned sequence is newest-first and
/// excludes soft-deleted rows.
#[async_trait]
pub trait RemoteRepository: Send + Sync {
    /// Lightweight `{id, created_at}` projection of every active entry
    async fn fetch_metadata(&self, owner: &UserId) -> Result<Vec<ActivityRecord>>;

    /// One page of full entries
    async fn fetch_page(
        &self,
        owner: &UserId,
        offset: usize,
        limit: usize,
        filter: EntryFilter,
    ) -> Result<Vec<RemoteEntry>>;

    /// Full entries for specific ids (used by date-scoped fetches)
    async fn fetch_by_ids(&self, owner: &UserId, ids: &[EntryId]) -> Result<Vec<RemoteEntry>>;

    /// Insert an entry; the store assigns id and timestamp
    async fn insert(&self, owner: &UserId, body: &str) -> Result<RemoteEntry>;

    /// Apply a partial update
    async fn update(&self, id: &EntryId, patch: &EntryPatch) -> Result<()>;

    /// Mark an entry deleted, keeping the row addressable
    async fn soft_delete(&self, id: &EntryId) -> Result<()>;

    /// Remove an entry permanently
    async fn hard_delete(&self, id: &EntryId) -> Result<()>;

    /// Atomically reassign all of `source`'s data to `destination`.
    ///
    /// Either everything moves or nothing does; running it again after
    /// success is harmless.
    async fn merge(&self, source: &UserId, destination: &UserId) -> Result<()>;
}

/// Profile row holding the streak high-water mark
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Load the profile, `None` when it was never written
    async fn fetch_profile(&self, owner: &UserId) -> Result<Option<Profile>>;

    /// Persist a new high-water mark
    async fn save_max_streak(&self, owner: &UserId, max_streak: u32, updated_at: i64)
        -> Result<()>;
}
