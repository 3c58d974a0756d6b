//! Journal entry model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::UserId;

/// A unique identifier for an entry, assigned by the remote store (UUID v7)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Create a new unique entry ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A journal entry as the UI sees it (plaintext)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique identifier
    pub id: EntryId,
    /// Owning identity
    pub owner_id: UserId,
    /// Plaintext content
    pub text: String,
    /// Favorite flag
    pub is_favorite: bool,
    /// Creation timestamp (Unix ms), never changes
    pub created_at: i64,
    /// Soft delete timestamp (Unix ms)
    pub deleted_at: Option<i64>,
}

impl Entry {
    /// Whether the entry has not been soft-deleted
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// The lightweight projection used for streaks and calendar marking
    #[must_use]
    pub const fn activity(&self) -> ActivityRecord {
        ActivityRecord {
            id: self.id,
            created_at: self.created_at,
        }
    }
}

/// An entry as persisted remotely; `body` is the opaque encoded text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub id: EntryId,
    pub owner_id: UserId,
    pub body: String,
    pub is_favorite: bool,
    pub created_at: i64,
    pub deleted_at: Option<i64>,
}

impl RemoteEntry {
    /// Attach decoded text, keeping every other field.
    #[must_use]
    pub fn with_text(self, text: String) -> Entry {
        Entry {
            id: self.id,
            owner_id: self.owner_id,
            text,
            is_favorite: self.is_favorite,
            created_at: self.created_at,
            deleted_at: self.deleted_at,
        }
    }
}

/// Lightweight `{id, created_at}` projection of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: EntryId,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

/// Partial update sent to the remote store. `text` is already encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
}

impl EntryPatch {
    #[must_use]
    pub const fn favorite(is_favorite: bool) -> Self {
        Self {
            text: None,
            is_favorite: Some(is_favorite),
        }
    }

    #[must_use]
    pub const fn text(encoded: String) -> Self {
        Self {
            text: Some(encoded),
            is_favorite: None,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.text.is_none() && self.is_favorite.is_none()
    }
}

/// Which entries the paginated list shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryFilter {
    #[default]
    All,
    Favorites,
}

impl EntryFilter {
    /// Whether an entry belongs in a list scoped by this filter
    #[must_use]
    pub const fn matches(self, entry: &Entry) -> bool {
        match self {
            Self::All => true,
            Self::Favorites => entry.is_favorite,
        }
    }
}

/// How a delete is carried out remotely
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteMode {
    /// Set `deleted_at`; the row stays addressable server-side
    #[default]
    Soft,
    /// Remove the row permanently
    Hard,
}
