//! Opening journal and cache databases

use std::fmt;
use std::path::Path;
use std::time::Duration;

use libsql::{Builder, Connection, Database as LibSqlDatabase};
use tracing::{debug, info};

use super::migrations;
use crate::error::Result;

/// What a database file holds. Each role has its own schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreRole {
    /// Entries and profiles, served to the coordinator as the remote store
    Journal,
    /// Cache snapshots, the pending-merge marker and the stored identity
    Cache,
}

impl StoreRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Journal => "journal",
            Self::Cache => "cache",
        }
    }
}

impl fmt::Display for StoreRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turso remote backing a journal embedded replica
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaConfig {
    pub url: String,
    pub auth_token: String,
    /// Background pull interval; `None` means manual `sync` only
    pub sync_interval: Option<Duration>,
}

impl ReplicaConfig {
    pub fn new(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: auth_token.into(),
            sync_interval: None,
        }
    }

    #[must_use]
    pub const fn with_sync_interval(mut self, interval: Option<Duration>) -> Self {
        self.sync_interval = interval;
        self
    }
}

/// A migrated libSQL database in one [`StoreRole`]
pub struct Database {
    inner: LibSqlDatabase,
    conn: Connection,
    role: StoreRole,
    replicated: bool,
}

impl Database {
    /// Local journal file
    pub async fn open_journal(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_file(path.as_ref(), StoreRole::Journal).await
    }

    /// Local cache file
    pub async fn open_cache(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_file(path.as_ref(), StoreRole::Cache).await
    }

    pub async fn open_in_memory(role: StoreRole) -> Result<Self> {
        let inner = Builder::new_local(":memory:").build().await?;
        Self::prepare(inner, role, false).await
    }

    /// Journal as an embedded replica of a Turso database. The first pull
    /// happens before migrating so an existing remote schema is reused.
    pub async fn open_journal_replica(
        path: impl AsRef<Path>,
        remote: ReplicaConfig,
    ) -> Result<Self> {
        ensure_parent_dir(path.as_ref())?;
        let mut builder = Builder::new_remote_replica(path.as_ref(), remote.url, remote.auth_token);
        if let Some(interval) = remote.sync_interval {
            debug!("Journal replica pulls every {:?}", interval);
            builder = builder.sync_interval(interval);
        }
        let inner = builder.build().await?;
        inner.sync().await?;
        info!("Journal replica ready at {}", path.as_ref().display());
        Self::prepare(inner, StoreRole::Journal, true).await
    }

    async fn open_file(path: &Path, role: StoreRole) -> Result<Self> {
        ensure_parent_dir(path)?;
        let inner = Builder::new_local(path).build().await?;
        debug!("Opened {} database at {}", role, path.display());
        Self::prepare(inner, role, false).await
    }

    async fn prepare(inner: LibSqlDatabase, role: StoreRole, replicated: bool) -> Result<Self> {
        let conn = inner.connect()?;
        if !replicated {
            // Replicas manage their own journal mode.
            conn.execute("PRAGMA journal_mode = WAL;", ()).await.ok();
        }
        migrations::run(&conn, role).await?;
        Ok(Self {
            inner,
            conn,
            role,
            replicated,
        })
    }

    /// Pull remote journal changes. Returns `false` for local databases.
    pub async fn sync(&self) -> Result<bool> {
        if !self.replicated {
            return Ok(false);
        }
        self.inner.sync().await?;
        debug!("Journal replica synced");
        Ok(true)
    }

    pub const fn role(&self) -> StoreRole {
        self.role
    }

    pub const fn is_replica(&self) -> bool {
        self.replicated
    }

    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(std::fs::create_dir_all(parent)?),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn table_exists(db: &Database, name: &str) -> bool {
        let mut rows = db
            .connection()
            .query(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
                [name],
            )
            .await
            .unwrap();
        rows.next().await.unwrap().unwrap().get::<i64>(0).unwrap() == 1
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_roles_get_their_own_schema() {
        let journal = Database::open_in_memory(StoreRole::Journal).await.unwrap();
        assert_eq!(journal.role(), StoreRole::Journal);
        assert!(table_exists(&journal, "entries").await);
        assert!(!table_exists(&journal, "kv_store").await);

        let cache = Database::open_in_memory(StoreRole::Cache).await.unwrap();
        assert!(table_exists(&cache, "kv_store").await);
        assert!(!table_exists(&cache, "entries").await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_local_journal_sync_is_a_no_op() {
        let db = Database::open_in_memory(StoreRole::Journal).await.unwrap();
        assert!(!db.is_replica());
        assert!(!db.sync().await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_cache_creates_parent_directories() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("cache.db");

        let db = Database::open_cache(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(db.role(), StoreRole::Cache);
    }

    #[test]
    fn test_replica_config_defaults_to_manual_sync() {
        let config = ReplicaConfig::new("libsql://journal.turso.io", "token");
        assert_eq!(config.sync_interval, None);

        let config = config.with_sync_interval(Some(Duration::from_secs(30)));
        assert_eq!(config.sync_interval, Some(Duration::from_secs(30)));
    }
}
