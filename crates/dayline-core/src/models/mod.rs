//! Data models for Dayline

mod entry;
mod identity;

pub use entry::{ActivityRecord, DeleteMode, Entry, EntryFilter, EntryId, EntryPatch, RemoteEntry};
pub use identity::{PendingMerge, Profile, SyncIdentity, UserId};
