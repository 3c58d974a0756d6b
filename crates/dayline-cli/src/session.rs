//! Identity persisted between CLI invocations.
//!
//! Stored as JSON in the local cache database. The first run creates an
//! anonymous identity; `login` replaces it with an authenticated one.

use dayline_core::db::LibSqlLocalStore;
use dayline_core::{Result, SyncIdentity};
use uuid::Uuid;

pub const SESSION_KEY: &str = "session";

pub async fn load_identity(store: &LibSqlLocalStore) -> Result<Option<SyncIdentity>> {
    let Some(raw) = store.get_value(SESSION_KEY).await? else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_str(&raw)?))
}

pub async fn save_identity(store: &LibSqlLocalStore, identity: &SyncIdentity) -> Result<()> {
    store
        .set_value(SESSION_KEY, &serde_json::to_string(identity)?)
        .await
}

pub async fn clear_identity(store: &LibSqlLocalStore) -> Result<()> {
    store.remove_value(SESSION_KEY).await
}

/// The stored identity, or a new anonymous one saved for next time.
pub async fn ensure_identity(store: &LibSqlLocalStore) -> Result<SyncIdentity> {
    if let Some(identity) = load_identity(store).await? {
        return Ok(identity);
    }
    let identity = new_anonymous_identity();
    save_identity(store, &identity).await?;
    tracing::info!("Created anonymous identity {}", identity.user_id);
    Ok(identity)
}

pub fn new_anonymous_identity() -> SyncIdentity {
    SyncIdentity::anonymous(format!("anon-{}", Uuid::now_v7()))
}
