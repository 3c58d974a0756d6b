//! Optimistic mutations.
//!
//! A mutation captures the lists, applies the change locally, then awaits the
//! remote write. On failure the captured lists are restored exactly.

use std::future::Future;

use tracing::{debug, warn};

use super::state::JournalState;
use super::SyncCoordinator;
use crate::error::{Error, Result};
use crate::models::{ActivityRecord, Entry};

/// Lists as they were before a local change
#[derive(Debug, Clone)]
pub(super) struct ListSnapshot {
    entries: Vec<Entry>,
    metadata: Vec<ActivityRecord>,
}

impl ListSnapshot {
    pub(super) fn capture(state: &JournalState) -> Self {
        Self {
            entries: state.entries.clone(),
            metadata: state.metadata.clone(),
        }
    }

    pub(super) fn restore(self, state: &mut JournalState) {
        state.entries = self.entries;
        state.metadata = self.metadata;
    }
}

impl SyncCoordinator {
    /// Apply `apply` to the in-memory lists, then run the remote write built
    /// by `remote` from its output. Rolls back and returns a write failure if
    /// the remote write fails; a session change in between skips the
    /// rollback since the state it would restore is gone.
    pub(super) async fn mutate_optimistically<T, A, R, Fut>(
        &self,
        label: &str,
        apply: A,
        remote: R,
    ) -> Result<T>
    where
        T: Copy,
        A: FnOnce(&mut JournalState) -> Result<T>,
        R: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let (token, snapshot, value) = {
            let mut state = self.state.lock().await;
            let token = state.token().ok_or(Error::NoSession)?;
            let snapshot = ListSnapshot::capture(&state);
            let value = apply(&mut state)?;
            state.touch_lists();
            self.persist_lists(&state, &token);
            (token, snapshot, value)
        };

        match remote(value).await {
            Ok(()) => {
                let state = self.state.lock().await;
                if state.is_current(&token) {
                    self.persist_lists(&state, &token);
                }
                debug!("Committed {}", label);
                Ok(value)
            }
            Err(error) => {
                let mut state = self.state.lock().await;
                if state.is_current(&token) {
                    snapshot.restore(&mut state);
                    state.touch_lists();
                    self.persist_lists(&state, &token);
                    warn!("Rolled back {} after remote failure: {}", label, error);
                } else {
                    debug!("Dropped rollback of {} for a previous session", label);
                }
                Err(error.into_write_failure())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryId, UserId};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_restore_replaces_both_lists() {
        let entry = Entry {
            id: EntryId::new(),
            owner_id: UserId::new("user-1"),
            text: "kept".to_string(),
            is_favorite: false,
            created_at: 10,
            deleted_at: None,
        };
        let mut state = JournalState {
            entries: vec![entry.clone()],
            metadata: vec![entry.activity()],
            ..JournalState::default()
        };
        let snapshot = ListSnapshot::capture(&state);

        state.entries.clear();
        state.metadata.clear();
        snapshot.restore(&mut state);

        assert_eq!(state.entries, vec![entry.clone()]);
        assert_eq!(state.metadata, vec![entry.activity()]);
    }
}
