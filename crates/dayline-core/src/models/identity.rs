//! Session identity and profile models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an owning identity (anonymous or authenticated)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The active owner identity for a session. Replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncIdentity {
    pub user_id: UserId,
    pub is_anonymous: bool,
}

impl SyncIdentity {
    #[must_use]
    pub fn anonymous(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            is_anonymous: true,
        }
    }

    #[must_use]
    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            is_anonymous: false,
        }
    }
}

/// Durable marker recording that an anonymous identity's data still has to be
/// merged into whichever authenticated identity signs in next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMerge {
    pub source_user_id: UserId,
    /// When the marker was written (Unix ms)
    pub created_at: i64,
}

impl PendingMerge {
    /// Whether this marker should be merged into `current`.
    #[must_use]
    pub fn applies_to(&self, current: &SyncIdentity) -> bool {
        !current.is_anonymous && self.source_user_id != current.user_id
    }
}

/// Single-row profile state holding the streak high-water mark
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    /// Highest streak ever achieved
    pub max_streak: u32,
    /// Last write timestamp (Unix ms)
    pub updated_at: i64,
}
