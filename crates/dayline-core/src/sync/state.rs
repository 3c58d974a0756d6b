//! Coordinator state and the session token used for stale-result suppression.

use crate::models::{ActivityRecord, Entry, EntryFilter, SyncIdentity, UserId};

/// Coordinator lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncPhase {
    /// No identity bound
    #[default]
    NoSession,
    /// Identity bound, nothing to show yet, network in flight
    LoadingCold,
    /// Cached snapshot shown, network refresh in flight
    LoadingCache,
    Ready,
    /// Anonymous data is being reassigned to the signed-in identity
    Merging,
    /// Last load failed with nothing to show
    Error,
}

/// Captured identity plus bind generation.
///
/// Every asynchronous operation captures the token when it starts and only
/// commits its result if the token is still current. Rebinding (including to
/// the same identity) bumps the generation, so completions from an earlier
/// bind are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    identity: SyncIdentity,
    generation: u64,
}

impl SessionToken {
    pub const fn identity(&self) -> &SyncIdentity {
        &self.identity
    }

    pub const fn user_id(&self) -> &UserId {
        &self.identity.user_id
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// Read-only copy of what the UI renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalView {
    pub phase: SyncPhase,
    pub identity: Option<SyncIdentity>,
    pub entries: Vec<Entry>,
    pub metadata: Vec<ActivityRecord>,
    pub filter: EntryFilter,
    pub has_more: bool,
    pub loading: bool,
    pub loading_more: bool,
}

/// The list as it stood before a filter switch
#[derive(Debug, Clone)]
pub(crate) struct ListSelection {
    filter: EntryFilter,
    entries: Vec<Entry>,
    has_more: bool,
}

#[derive(Debug, Default)]
pub(crate) struct JournalState {
    pub session: Option<SessionToken>,
    pub generation: u64,
    pub entries: Vec<Entry>,
    pub metadata: Vec<ActivityRecord>,
    pub filter: EntryFilter,
    /// Bumped whenever the lists change locally or the filter switches; list
    /// reads started under an older epoch are dropped.
    pub list_epoch: u64,
    pub has_more: bool,
    pub loading: bool,
    pub loading_more: bool,
    /// Generation of the session a merge is running into. Only that session
    /// holds off its own reads; the gate itself is global.
    pub merge_target: Option<u64>,
    pub max_streak: u32,
    pub profile_updated_at: i64,
}

impl JournalState {
    /// Replace the session wholesale and reset everything derived from it.
    /// A running merge keeps the gate closed across rebinds.
    pub fn rebind(&mut self, identity: Option<SyncIdentity>) -> Option<SessionToken> {
        let generation = self.generation + 1;
        *self = Self {
            generation,
            list_epoch: self.list_epoch + 1,
            merge_target: self.merge_target,
            ..Self::default()
        };
        self.session = identity.map(|identity| SessionToken {
            identity,
            generation,
        });
        self.session.clone()
    }

    pub fn token(&self) -> Option<SessionToken> {
        self.session.clone()
    }

    pub fn is_current(&self, token: &SessionToken) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.generation == token.generation)
    }

    /// A merge is running, into this session or an earlier one.
    pub const fn is_merging(&self) -> bool {
        self.merge_target.is_some()
    }

    /// `token`'s session is the one a running merge writes into.
    pub fn is_merge_target(&self, token: &SessionToken) -> bool {
        self.merge_target == Some(token.generation) && self.is_current(token)
    }

    pub fn touch_lists(&mut self) {
        self.list_epoch += 1;
    }

    /// Switch to `filter` with an empty list, returning what was shown.
    pub fn switch_filter(&mut self, filter: EntryFilter) -> ListSelection {
        let previous = ListSelection {
            filter: self.filter,
            entries: std::mem::take(&mut self.entries),
            has_more: self.has_more,
        };
        self.filter = filter;
        self.has_more = false;
        self.touch_lists();
        previous
    }

    /// Go back to a selection taken by [`Self::switch_filter`]. Entries
    /// deleted since are left out; entries created or changed since win over
    /// their saved copies.
    pub fn restore_selection(&mut self, saved: ListSelection) {
        let current = std::mem::take(&mut self.entries);
        let mut entries: Vec<Entry> = current
            .iter()
            .filter(|entry| !saved.entries.iter().any(|old| old.id == entry.id))
            .filter(|entry| saved.filter.matches(entry))
            .cloned()
            .collect();
        for old in saved.entries {
            if !self.metadata.iter().any(|record| record.id == old.id) {
                continue;
            }
            let latest = current
                .iter()
                .find(|entry| entry.id == old.id)
                .cloned()
                .unwrap_or(old);
            if saved.filter.matches(&latest) {
                entries.push(latest);
            }
        }
        self.entries = entries;
        self.filter = saved.filter;
        self.has_more = saved.has_more;
        self.touch_lists();
    }

    /// Install a freshly fetched first page.
    pub fn apply_first_page(&mut self, page: Vec<Entry>, page_size: usize) {
        self.has_more = page.len() == page_size;
        self.entries = page;
    }

    /// Append a later page, skipping ids already present.
    pub fn append_page(&mut self, page: Vec<Entry>, page_size: usize) -> usize {
        self.has_more = page.len() == page_size;
        let before = self.entries.len();
        for entry in page {
            if !self.entries.iter().any(|existing| existing.id == entry.id) {
                self.entries.push(entry);
            }
        }
        self.entries.len() - before
    }

    pub fn view(&self, phase: SyncPhase) -> JournalView {
        JournalView {
            phase,
            identity: self.session.as_ref().map(|token| token.identity.clone()),
            entries: self.entries.clone(),
            metadata: self.metadata.clone(),
            filter: self.filter,
            has_more: self.has_more,
            loading: self.loading,
            loading_more: self.loading_more,
        }
    }
}
