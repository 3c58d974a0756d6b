//! libSQL storage for Dayline
//!
//! A [`Database`] is opened in one [`StoreRole`]. Journal databases back
//! [`LibSqlJournalRepository`] (the remote store, optionally a Turso embedded
//! replica); cache databases back [`LibSqlLocalStore`] (cache snapshots and
//! the pending-merge marker).

mod connection;
mod journal_repository;
mod local_store;
mod migrations;

pub use connection::{Database, ReplicaConfig, StoreRole};
pub use journal_repository::LibSqlJournalRepository;
pub use local_store::LibSqlLocalStore;
