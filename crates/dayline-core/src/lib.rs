//! dayline-core - Core library for Dayline
//!
//! This crate contains the journal models, the streak engine, the local cache
//! store, the remote repository interface, and the sync coordinator that keeps
//! them consistent. The CLI (and any future UI) only talks to
//! [`sync::SyncCoordinator`].

pub mod cache;
pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod streak;
pub mod sync;
pub mod tasks;
pub mod util;

pub use error::{Error, Result};
pub use models::{ActivityRecord, Entry, EntryFilter, EntryId, SyncIdentity, UserId};
pub use streak::StreakState;
pub use sync::{SyncCoordinator, SyncPhase};
