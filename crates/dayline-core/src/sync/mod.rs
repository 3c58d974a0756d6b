//! Sync coordinator.
//!
//! Owns the in-memory journal state for the active identity and keeps it
//! consistent with the remote store and the local cache:
//!
//! - binding a session shows the cached snapshot first, then refreshes
//! - every read captures a [`SessionToken`] and is dropped if the session
//!   changed while it was in flight
//! - writes are applied optimistically and rolled back on failure
//! - anonymous data is merged into the signed-in identity exactly once
//!
//! State lives behind a single async mutex that is never held across a remote
//! call. Cache and profile writes run detached on [`BackgroundTasks`].

mod optimistic;
mod state;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::cache::{CacheWriter, LocalCacheStore, MergeMarkerStore};
use crate::codec::{open_entries, TextCodec};
use crate::config::SyncSettings;
use crate::error::{Error, Result};
use crate::models::{
    ActivityRecord, DeleteMode, Entry, EntryFilter, EntryId, EntryPatch, PendingMerge, Profile,
    SyncIdentity, UserId,
};
use crate::remote::{ProfileStore, RemoteRepository};
use crate::streak::{activity_days, compute_streak_at, compute_streak_now, StreakState};
use crate::tasks::BackgroundTasks;
use crate::util::{compact_text, normalize_text_option, unix_millis_now};

use state::JournalState;
pub use state::{JournalView, SessionToken, SyncPhase};

/// Collaborators the coordinator is wired to
pub struct SyncDeps {
    pub remote: Arc<dyn RemoteRepository>,
    pub profiles: Arc<dyn ProfileStore>,
    pub cache: Arc<dyn LocalCacheStore>,
    pub markers: Arc<dyn MergeMarkerStore>,
    pub codec: Arc<dyn TextCodec>,
}

/// Result of asking the coordinator to run a pending merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The remote merge ran and the marker was cleared
    Merged,
    /// No marker applies to the current identity
    NotPending,
    /// Another merge is in flight
    AlreadyRunning,
    /// The merge ran but the session changed before it finished
    Superseded,
}

pub struct SyncCoordinator {
    remote: Arc<dyn RemoteRepository>,
    profiles: Arc<dyn ProfileStore>,
    markers: Arc<dyn MergeMarkerStore>,
    codec: Arc<dyn TextCodec>,
    cache: CacheWriter,
    settings: SyncSettings,
    state: Mutex<JournalState>,
    phase: watch::Sender<SyncPhase>,
    tasks: BackgroundTasks,
}

impl SyncCoordinator {
    pub fn new(deps: SyncDeps, settings: SyncSettings) -> Self {
        let (phase, _) = watch::channel(SyncPhase::NoSession);
        Self {
            remote: deps.remote,
            profiles: deps.profiles,
            markers: deps.markers,
            codec: deps.codec,
            cache: CacheWriter::new(deps.cache, settings.cache_page_limit),
            settings,
            state: Mutex::new(JournalState::default()),
            phase,
            tasks: BackgroundTasks::new(),
        }
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// Watch phase transitions.
    pub fn subscribe_phase(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    pub async fn identity(&self) -> Option<SyncIdentity> {
        let state = self.state.lock().await;
        state.session.as_ref().map(|token| token.identity().clone())
    }

    pub async fn view(&self) -> JournalView {
        let state = self.state.lock().await;
        state.view(self.phase())
    }

    pub async fn entries(&self) -> Vec<Entry> {
        self.state.lock().await.entries.clone()
    }

    pub async fn metadata(&self) -> Vec<ActivityRecord> {
        self.state.lock().await.metadata.clone()
    }

    pub async fn has_more(&self) -> bool {
        self.state.lock().await.has_more
    }

    pub async fn filter(&self) -> EntryFilter {
        self.state.lock().await.filter
    }

    /// Persisted streak high-water mark for the current identity
    pub async fn max_streak(&self) -> u32 {
        self.state.lock().await.max_streak
    }

    /// Wait until detached cache and profile writes have finished.
    pub async fn settle(&self) {
        debug!("Settling {} background writes", self.tasks.pending());
        self.tasks.settle().await;
    }

    // ---- session lifecycle ----

    /// React to an identity change (sign in, sign out, token refresh).
    ///
    /// Always rebinds, even to the same identity, unless a merge into that
    /// identity is running. Read failures are absorbed into the phase.
    pub async fn bind_session(&self, identity: Option<SyncIdentity>) {
        let token = {
            let mut state = self.state.lock().await;
            let duplicate = state.session.as_ref().is_some_and(|token| {
                state.is_merge_target(token) && Some(token.identity()) == identity.as_ref()
            });
            if duplicate {
                debug!("Ignoring duplicate identity event during merge");
                return;
            }
            let token = state.rebind(identity);
            self.publish(if token.is_some() {
                SyncPhase::LoadingCold
            } else {
                SyncPhase::NoSession
            });
            token
        };

        let Some(token) = token else {
            info!("Session cleared");
            return;
        };
        info!(
            "Session bound to {} (anonymous: {})",
            token.user_id(),
            token.identity().is_anonymous
        );

        let Some(marker) = self.pending_merge_for(&token).await else {
            self.cold_start(&token).await;
            return;
        };
        match self.merge_into(&token, marker).await {
            Ok(MergeOutcome::AlreadyRunning) => {
                debug!(
                    "A merge into an earlier session is running; loading {}",
                    token.user_id()
                );
                self.cold_start(&token).await;
            }
            Ok(_) => {}
            Err(error) => warn!("Merge into {} failed: {}", token.user_id(), error),
        }
    }

    /// Called when the app returns to the foreground: retry a pending merge,
    /// otherwise refresh.
    pub async fn on_foreground(&self) {
        match self.run_pending_merge().await {
            Ok(MergeOutcome::NotPending | MergeOutcome::AlreadyRunning) => {}
            Ok(outcome) => {
                debug!("Foreground merge finished: {:?}", outcome);
                return;
            }
            Err(Error::NoSession) => return,
            Err(error) => {
                warn!("Foreground merge failed: {}", error);
                return;
            }
        }
        if let Err(error) = self.refresh().await {
            warn!("Foreground refresh failed: {}", error);
        }
    }

    async fn cold_start(&self, token: &SessionToken) {
        let cached = match self.cache.store().get(token.user_id()).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!("Ignoring unreadable cache for {}: {}", token.user_id(), error);
                None
            }
        };

        if let Some(snapshot) = cached.filter(|snapshot| !snapshot.is_empty()) {
            let mut state = self.state.lock().await;
            if state.is_current(token) && state.entries.is_empty() && state.metadata.is_empty() {
                debug!(
                    "Showing {} cached entries for {}",
                    snapshot.entries.len(),
                    token.user_id()
                );
                state.entries = snapshot.entries;
                state.metadata = snapshot.metadata;
                self.publish(SyncPhase::LoadingCache);
            }
        }

        if let Err(error) = self.refresh_session(token).await {
            warn!("Initial load for {} failed: {}", token.user_id(), error);
        }
    }

    // ---- reads ----

    /// Re-fetch metadata, the first page, and the profile for the current
    /// session. State is kept as-is on failure.
    pub async fn refresh(&self) -> Result<()> {
        let token = self.current_token().await?;
        self.refresh_session(&token).await
    }

    async fn refresh_session(&self, token: &SessionToken) -> Result<()> {
        let (filter, epoch) = {
            let mut state = self.state.lock().await;
            if !state.is_current(token) || state.is_merge_target(token) {
                return Ok(());
            }
            state.loading = true;
            (state.filter, state.list_epoch)
        };

        let user = token.user_id();
        let (metadata, page, profile) = tokio::join!(
            self.remote.fetch_metadata(user),
            self.fetch_page(user, 0, filter),
            self.profiles.fetch_profile(user),
        );

        let mut state = self.state.lock().await;
        if !state.is_current(token) {
            debug!("Discarding stale refresh for {}", user);
            return Ok(());
        }
        state.loading = false;

        match profile {
            Ok(Some(profile)) => Self::apply_profile(&mut state, profile),
            Ok(None) => {}
            Err(error) => warn!("Failed to fetch profile for {}: {}", user, error),
        }

        let mut failure = None;
        if state.list_epoch == epoch {
            match metadata {
                Ok(metadata) => {
                    state.metadata = metadata;
                    self.cache.persist_metadata(&self.tasks, user, &state.metadata);
                    self.track_high_water_mark(&mut state, token);
                }
                Err(error) => failure = Some(error),
            }
            match page {
                Ok(page) => {
                    state.apply_first_page(page, self.settings.page_size);
                    if state.filter == EntryFilter::All {
                        self.cache.persist_entries(&self.tasks, user, &state.entries);
                    }
                }
                Err(error) => failure = failure.or(Some(error)),
            }
        } else {
            debug!("Lists changed locally during refresh; keeping local state");
        }

        match failure {
            None => {
                self.publish(SyncPhase::Ready);
                Ok(())
            }
            Some(error) => {
                warn!("Refresh for {} failed: {}", user, error);
                let showing_something = !state.entries.is_empty() || !state.metadata.is_empty();
                self.publish(if showing_something {
                    SyncPhase::Ready
                } else {
                    SyncPhase::Error
                });
                Err(as_read_failure(error))
            }
        }
    }

    /// Fetch the next page. Returns how many entries were appended; a no-op
    /// when nothing more is available or a load is already running.
    pub async fn load_more(&self) -> Result<usize> {
        let (token, offset, filter, epoch) = {
            let mut state = self.state.lock().await;
            let Some(token) = state.token() else {
                return Ok(0);
            };
            if state.loading || state.loading_more || !state.has_more {
                return Ok(0);
            }
            state.loading_more = true;
            (token, state.entries.len(), state.filter, state.list_epoch)
        };

        let result = self.fetch_page(token.user_id(), offset, filter).await;

        let mut state = self.state.lock().await;
        if !state.is_current(&token) {
            debug!("Discarding page at offset {} from a previous session", offset);
            return Ok(0);
        }
        state.loading_more = false;
        if state.list_epoch != epoch {
            debug!("Discarding stale page at offset {}", offset);
            return Ok(0);
        }
        match result {
            Ok(page) => Ok(state.append_page(page, self.settings.page_size)),
            Err(error) => {
                warn!("Failed to load page at offset {}: {}", offset, error);
                Err(as_read_failure(error))
            }
        }
    }

    /// Switch the list between all entries and favorites. Resets pagination
    /// and re-fetches the first page; the metadata list is not touched.
    /// The previous list comes back if the fetch fails.
    pub async fn set_filter(&self, filter: EntryFilter) -> Result<()> {
        let (token, previous) = {
            let mut state = self.state.lock().await;
            let token = state.token().ok_or(Error::NoSession)?;
            if state.filter == filter {
                return Ok(());
            }
            let previous = state.switch_filter(filter);
            state.loading = true;
            (token, previous)
        };

        let result = self.fetch_page(token.user_id(), 0, filter).await;

        let mut state = self.state.lock().await;
        if !state.is_current(&token) || state.filter != filter {
            debug!("Discarding stale {:?} page", filter);
            return Ok(());
        }
        state.loading = false;
        match result {
            Ok(page) => {
                state.apply_first_page(page, self.settings.page_size);
                if filter == EntryFilter::All {
                    self.cache
                        .persist_entries(&self.tasks, token.user_id(), &state.entries);
                }
                Ok(())
            }
            Err(error) => {
                warn!("Failed to load {:?} entries: {}", filter, error);
                state.restore_selection(previous);
                Err(as_read_failure(error))
            }
        }
    }

    /// Entries created on `day` in the local calendar. Ids are resolved from
    /// the metadata list, then fetched in full.
    pub async fn entries_for_day(&self, day: NaiveDate) -> Result<Vec<Entry>> {
        let (token, ids) = {
            let state = self.state.lock().await;
            let token = state.token().ok_or(Error::NoSession)?;
            let ids: Vec<EntryId> = state
                .metadata
                .iter()
                .filter(|record| local_day(record.created_at) == Some(day))
                .map(|record| record.id)
                .collect();
            (token, ids)
        };
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let remote = self
            .remote
            .fetch_by_ids(token.user_id(), &ids)
            .await
            .map_err(as_read_failure)?;
        let mut entries = open_entries(self.codec.as_ref(), remote).await;
        entries.retain(Entry::is_active);
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        if !self.state.lock().await.is_current(&token) {
            debug!("Discarding entries for {} from a previous session", day);
            return Ok(Vec::new());
        }
        Ok(entries)
    }

    // ---- streak ----

    pub async fn streak(&self) -> StreakState {
        let state = self.state.lock().await;
        compute_streak_now(&state.metadata, state.max_streak)
    }

    /// Streak as seen at `now`, in `now`'s time zone.
    pub async fn streak_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> StreakState {
        let state = self.state.lock().await;
        compute_streak_at(&state.metadata, state.max_streak, now)
    }

    /// Local calendar days with at least one active entry
    pub async fn active_days(&self) -> BTreeSet<NaiveDate> {
        let state = self.state.lock().await;
        activity_days(state.metadata.iter().map(|record| record.created_at), &Local)
    }

    /// Persist a new high-water mark when the current streak exceeds it.
    fn track_high_water_mark(&self, state: &mut JournalState, token: &SessionToken) {
        let streak = compute_streak_now(&state.metadata, state.max_streak).streak;
        if streak <= state.max_streak {
            return;
        }
        let updated_at = unix_millis_now().max(state.profile_updated_at + 1);
        state.max_streak = streak;
        state.profile_updated_at = updated_at;
        debug!("New streak high-water mark {} for {}", streak, token.user_id());

        let profiles = Arc::clone(&self.profiles);
        let user = token.user_id().clone();
        self.tasks.spawn("high-water mark write", async move {
            profiles.save_max_streak(&user, streak, updated_at).await
        });
    }

    /// Accept a fetched profile unless a local write is newer.
    fn apply_profile(state: &mut JournalState, profile: Profile) {
        if profile.updated_at < state.profile_updated_at {
            debug!(
                "Discarding profile from {} older than local write at {}",
                profile.updated_at, state.profile_updated_at
            );
            return;
        }
        state.max_streak = profile.max_streak;
        state.profile_updated_at = profile.updated_at;
    }

    // ---- writes ----

    /// Create an entry. Not optimistic: the entry is prepended once the remote
    /// store has assigned its id and timestamp.
    pub async fn add_entry(&self, text: &str) -> Result<Entry> {
        let text = normalize_text_option(Some(text.to_string()))
            .ok_or_else(|| Error::InvalidInput("Entry text cannot be empty".to_string()))?;
        let token = self.current_token().await?;

        let body = self
            .codec
            .encrypt(&text)
            .await
            .map_err(Error::into_write_failure)?;
        let stored = self
            .remote
            .insert(token.user_id(), &body)
            .await
            .map_err(Error::into_write_failure)?;
        let entry = stored.with_text(text);

        let mut state = self.state.lock().await;
        if state.is_current(&token) {
            if state.filter.matches(&entry) {
                state.entries.insert(0, entry.clone());
            }
            state.metadata.insert(0, entry.activity());
            state.touch_lists();
            self.persist_lists(&state, &token);
            self.track_high_water_mark(&mut state, &token);
        } else {
            debug!("Created entry {} after the session changed", entry.id);
        }
        info!("Created entry {}", entry.id);
        Ok(entry)
    }

    /// Flip the favorite flag of a loaded entry. Returns the new value.
    pub async fn toggle_favorite(&self, id: EntryId) -> Result<bool> {
        let remote = &self.remote;
        self.mutate_optimistically(
            "favorite toggle",
            move |state| apply_favorite(state, id, None),
            move |value| async move { remote.update(&id, &EntryPatch::favorite(value)).await },
        )
        .await
    }

    /// Set the favorite flag. Works for entries that are not in the loaded
    /// list as long as they are in the metadata list.
    pub async fn set_favorite(&self, id: EntryId, value: bool) -> Result<()> {
        let remote = &self.remote;
        self.mutate_optimistically(
            "favorite update",
            move |state| apply_favorite(state, id, Some(value)),
            move |value| async move { remote.update(&id, &EntryPatch::favorite(value)).await },
        )
        .await
        .map(|_| ())
    }

    /// Replace the text of an entry.
    pub async fn edit_entry(&self, id: EntryId, text: &str) -> Result<()> {
        let text = normalize_text_option(Some(text.to_string()))
            .ok_or_else(|| Error::InvalidInput("Entry text cannot be empty".to_string()))?;
        let body = self
            .codec
            .encrypt(&text)
            .await
            .map_err(Error::into_write_failure)?;
        let patch = EntryPatch::text(body);
        let remote = &self.remote;

        self.mutate_optimistically(
            "edit",
            move |state| {
                if let Some(entry) = state.entries.iter_mut().find(|entry| entry.id == id) {
                    entry.text = text;
                    Ok(())
                } else if state.metadata.iter().any(|record| record.id == id) {
                    Ok(())
                } else {
                    Err(Error::NotFound(id.to_string()))
                }
            },
            move |()| async move { remote.update(&id, &patch).await },
        )
        .await
    }

    /// Delete an entry. Soft deletes keep the row remotely but drop it from
    /// every list; hard deletes remove it.
    pub async fn delete_entry(&self, id: EntryId, mode: DeleteMode) -> Result<()> {
        let remote = &self.remote;
        self.mutate_optimistically(
            "delete",
            move |state| {
                let before = state.entries.len() + state.metadata.len();
                state.entries.retain(|entry| entry.id != id);
                state.metadata.retain(|record| record.id != id);
                if state.entries.len() + state.metadata.len() == before {
                    return Err(Error::NotFound(id.to_string()));
                }
                Ok(())
            },
            move |()| async move {
                match mode {
                    DeleteMode::Soft => remote.soft_delete(&id).await,
                    DeleteMode::Hard => remote.hard_delete(&id).await,
                }
            },
        )
        .await
    }

    // ---- identity upgrade ----

    /// Record that the current anonymous identity is about to be upgraded.
    /// Call before starting sign-in; the merge runs when the authenticated
    /// identity binds. Returns `None` for an authenticated session.
    pub async fn prepare_identity_upgrade(&self) -> Result<Option<PendingMerge>> {
        let token = self.current_token().await?;
        if !token.identity().is_anonymous {
            return Ok(None);
        }
        if let Some(existing) = self.markers.load_marker().await? {
            if &existing.source_user_id == token.user_id() {
                return Ok(Some(existing));
            }
            warn!(
                "Replacing pending merge from {} with {}",
                existing.source_user_id,
                token.user_id()
            );
        }
        let marker = PendingMerge {
            source_user_id: token.user_id().clone(),
            created_at: unix_millis_now(),
        };
        self.markers.save_marker(&marker).await?;
        info!("Recorded pending merge from {}", marker.source_user_id);
        Ok(Some(marker))
    }

    /// Run the pending merge for the current identity if one applies.
    pub async fn run_pending_merge(&self) -> Result<MergeOutcome> {
        let token = self.current_token().await?;
        let marker = match self.markers.load_marker().await {
            Ok(Some(marker)) if marker.applies_to(token.identity()) => marker,
            Ok(_) => return Ok(MergeOutcome::NotPending),
            Err(error) => return Err(error),
        };
        self.merge_into(&token, marker).await
    }

    async fn pending_merge_for(&self, token: &SessionToken) -> Option<PendingMerge> {
        match self.markers.load_marker().await {
            Ok(marker) => marker.filter(|marker| marker.applies_to(token.identity())),
            Err(error) => {
                warn!("Failed to read pending merge marker: {}", error);
                None
            }
        }
    }

    async fn merge_into(&self, token: &SessionToken, marker: PendingMerge) -> Result<MergeOutcome> {
        {
            let mut state = self.state.lock().await;
            if state.is_merging() {
                return Ok(MergeOutcome::AlreadyRunning);
            }
            if !state.is_current(token) {
                return Ok(MergeOutcome::Superseded);
            }
            state.merge_target = Some(token.generation());
            state.entries.clear();
            state.metadata.clear();
            state.has_more = false;
            state.touch_lists();
            self.publish(SyncPhase::Merging);
        }

        info!(
            "Merging {} into {}",
            marker.source_user_id,
            token.user_id()
        );
        let result = self.remote.merge(&marker.source_user_id, token.user_id()).await;

        if let Err(error) = result {
            {
                let mut state = self.state.lock().await;
                state.merge_target = None;
                if state.is_current(token) {
                    self.publish(SyncPhase::Error);
                }
            }
            // Keep the destination identity usable; the marker stays for a retry.
            if let Err(refresh_error) = self.refresh_session(token).await {
                debug!("Refresh after failed merge also failed: {}", refresh_error);
            }
            return Err(Error::Merge(error.to_string()));
        }

        // The merge is committed once the marker is gone.
        if let Err(error) = self.markers.clear_marker().await {
            warn!("Failed to clear pending merge marker: {}", error);
        }

        let next = {
            let mut state = self.state.lock().await;
            state.merge_target = None;
            if state.is_current(token) {
                let next = state.rebind(Some(token.identity().clone()));
                self.publish(SyncPhase::LoadingCold);
                next
            } else {
                None
            }
        };
        let Some(next) = next else {
            return Ok(MergeOutcome::Superseded);
        };
        info!("Merged {} into {}", marker.source_user_id, next.user_id());
        if let Err(error) = self.refresh_session(&next).await {
            warn!("Refresh after merge failed: {}", error);
        }
        Ok(MergeOutcome::Merged)
    }

    // ---- helpers ----

    async fn current_token(&self) -> Result<SessionToken> {
        self.state.lock().await.token().ok_or(Error::NoSession)
    }

    async fn fetch_page(&self, user: &UserId, offset: usize, filter: EntryFilter) -> Result<Vec<Entry>> {
        let page = self
            .remote
            .fetch_page(user, offset, self.settings.page_size, filter)
            .await?;
        let mut entries = open_entries(self.codec.as_ref(), page).await;
        entries.retain(Entry::is_active);
        Ok(entries)
    }

    fn persist_lists(&self, state: &JournalState, token: &SessionToken) {
        self.cache
            .persist_metadata(&self.tasks, token.user_id(), &state.metadata);
        if state.filter == EntryFilter::All {
            self.cache
                .persist_entries(&self.tasks, token.user_id(), &state.entries);
        }
    }

    fn publish(&self, phase: SyncPhase) {
        self.phase.send_replace(phase);
    }
}

/// Flip (`None`) or set the favorite flag in the loaded list. An entry that
/// no longer matches the favorites filter leaves the list.
fn apply_favorite(state: &mut JournalState, id: EntryId, value: Option<bool>) -> Result<bool> {
    let filter = state.filter;
    let Some(position) = state.entries.iter().position(|entry| entry.id == id) else {
        return match value {
            Some(value) if state.metadata.iter().any(|record| record.id == id) => Ok(value),
            _ => Err(Error::NotFound(id.to_string())),
        };
    };
    let entry = &mut state.entries[position];
    let value = value.unwrap_or(!entry.is_favorite);
    entry.is_favorite = value;
    if !filter.matches(entry) {
        state.entries.remove(position);
    }
    Ok(value)
}

fn local_day(created_at: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(created_at).map(|utc| utc.with_timezone(&Local).date_naive())
}

fn as_read_failure(error: Error) -> Error {
    match error {
        Error::Network(_) => error,
        other if other.is_transient() => Error::Network(compact_text(&other.to_string())),
        other => other,
    }
}
