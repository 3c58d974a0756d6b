//! Database migrations
//!
//! Each [`StoreRole`] has its own ordered list of steps and its own version
//! rows in `schema_version`.

use libsql::{params, Connection};

use super::connection::StoreRole;
use crate::error::Result;

type Step = &'static [&'static str];

/// Version 1: entries and profiles
const JOURNAL_STEPS: &[Step] = &[&[
    "CREATE TABLE IF NOT EXISTS entries (
        id TEXT PRIMARY KEY,
        owner_id TEXT NOT NULL,
        body TEXT NOT NULL,
        is_favorite INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        deleted_at INTEGER
    )",
    "CREATE INDEX IF NOT EXISTS idx_entries_owner_created
        ON entries(owner_id, created_at DESC)",
    "CREATE TABLE IF NOT EXISTS profiles (
        user_id TEXT PRIMARY KEY,
        max_streak INTEGER NOT NULL DEFAULT 0,
        updated_at INTEGER NOT NULL
    )",
]];

/// Version 1: key-value table for snapshots, the merge marker and the session
const CACHE_STEPS: &[Step] = &[&["CREATE TABLE IF NOT EXISTS kv_store (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    )"]];

const fn steps(role: StoreRole) -> &'static [Step] {
    match role {
        StoreRole::Journal => JOURNAL_STEPS,
        StoreRole::Cache => CACHE_STEPS,
    }
}

/// Apply every step of `role` newer than the recorded version.
pub async fn run(conn: &Connection, role: StoreRole) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            role TEXT NOT NULL,
            version INTEGER NOT NULL,
            PRIMARY KEY (role, version)
        )",
        (),
    )
    .await?;

    let current = recorded_version(conn, role).await?;
    for (version, statements) in (1_i64..).zip(steps(role).iter().copied()) {
        if version > current {
            apply(conn, role, version, statements).await?;
            tracing::debug!("Migrated {} schema to version {}", role, version);
        }
    }
    Ok(())
}

async fn recorded_version(conn: &Connection, role: StoreRole) -> Result<i64> {
    let mut rows = conn
        .query(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version WHERE role = ?",
            [role.as_str()],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(row.get(0)?),
        None => Ok(0),
    }
}

async fn apply(conn: &Connection, role: StoreRole, version: i64, statements: Step) -> Result<()> {
    let tx = conn.transaction().await?;
    for statement in statements {
        tx.execute(statement, ()).await?;
    }
    tx.execute(
        "INSERT INTO schema_version (role, version) VALUES (?, ?)",
        params![role.as_str(), version],
    )
    .await?;
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations_are_idempotent_per_role() {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        let conn = db.connect().unwrap();

        run(&conn, StoreRole::Journal).await.unwrap();
        run(&conn, StoreRole::Journal).await.unwrap();
        assert_eq!(recorded_version(&conn, StoreRole::Journal).await.unwrap(), 1);
        assert_eq!(recorded_version(&conn, StoreRole::Cache).await.unwrap(), 0);

        run(&conn, StoreRole::Cache).await.unwrap();
        assert_eq!(recorded_version(&conn, StoreRole::Cache).await.unwrap(), 1);
    }
}
