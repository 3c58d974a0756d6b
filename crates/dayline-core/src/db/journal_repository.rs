//! libSQL implementation of the remote journal store

use std::sync::Arc;

use async_trait::async_trait;
use libsql::{params, params_from_iter, Row, Value};

use super::Database;
use crate::error::{Error, Result};
use crate::models::{
    ActivityRecord, EntryFilter, EntryId, EntryPatch, Profile, RemoteEntry, UserId,
};
use crate::remote::{ProfileStore, RemoteRepository};
use crate::util::unix_millis_now;

const ENTRY_COLUMNS: &str = "id, owner_id, body, is_favorite, created_at, deleted_at";

fn sql_integer(name: &str, value: usize) -> Result<i64> {
    i64::try_from(value).map_err(|_| Error::InvalidInput(format!("{name} out of range: {value}")))
}

/// Journal store on a libSQL database (local file or Turso embedded replica)
#[derive(Clone)]
pub struct LibSqlJournalRepository {
    db: Arc<Database>,
}

impl LibSqlJournalRepository {
    /// Create a new repository over the given database
    pub const fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Pull remote changes. Returns `false` when the journal is not a replica.
    pub async fn sync(&self) -> Result<bool> {
        self.db.sync().await
    }

    /// Fetch a single entry, including soft-deleted ones
    pub async fn get(&self, id: &EntryId) -> Result<Option<RemoteEntry>> {
        let mut rows = self
            .db
            .connection()
            .query(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?"),
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_entry(&row)?)),
            None => Ok(None),
        }
    }

    /// Parse an entry from a database row
    fn parse_entry(row: &Row) -> Result<RemoteEntry> {
        let id: String = row.get(0)?;
        Ok(RemoteEntry {
            id: id
                .parse()
                .map_err(|_| Error::InvalidInput(format!("Invalid entry ID: {id}")))?,
            owner_id: UserId::new(row.get::<String>(1)?),
            body: row.get(2)?,
            is_favorite: row.get::<i64>(3)? != 0,
            created_at: row.get(4)?,
            deleted_at: row.get::<Option<i64>>(5)?,
        })
    }

    async fn collect_entries(&self, sql: &str, params: Vec<Value>) -> Result<Vec<RemoteEntry>> {
        let mut rows = self
            .db
            .connection()
            .query(sql, params_from_iter(params))
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(Self::parse_entry(&row)?);
        }
        Ok(entries)
    }
}

#[async_trait]
impl RemoteRepository for LibSqlJournalRepository {
    async fn fetch_metadata(&self, owner: &UserId) -> Result<Vec<ActivityRecord>> {
        let mut rows = self
            .db
            .connection()
            .query(
                "SELECT id, created_at FROM entries
                 WHERE owner_id = ? AND deleted_at IS NULL
                 ORDER BY created_at DESC, id DESC",
                params![owner.as_str()],
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            let id: String = row.get(0)?;
            records.push(ActivityRecord {
                id: id
                    .parse()
                    .map_err(|_| Error::InvalidInput(format!("Invalid entry ID: {id}")))?,
                created_at: row.get(1)?,
            });
        }
        Ok(records)
    }

    async fn fetch_page(
        &self,
        owner: &UserId,
        offset: usize,
        limit: usize,
        filter: EntryFilter,
    ) -> Result<Vec<RemoteEntry>> {
        let favorites_clause = match filter {
            EntryFilter::All => "",
            EntryFilter::Favorites => " AND is_favorite = 1",
        };
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM entries
             WHERE owner_id = ? AND deleted_at IS NULL{favorites_clause}
             ORDER BY created_at DESC, id DESC
             LIMIT ? OFFSET ?"
        );
        self.collect_entries(
            &sql,
            vec![
                Value::from(owner.as_str().to_string()),
                Value::from(sql_integer("limit", limit)?),
                Value::from(sql_integer("offset", offset)?),
            ],
        )
        .await
    }

    async fn fetch_by_ids(&self, owner: &UserId, ids: &[EntryId]) -> Result<Vec<RemoteEntry>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM entries
             WHERE owner_id = ? AND deleted_at IS NULL AND id IN ({placeholders})
             ORDER BY created_at DESC, id DESC"
        );
        let mut values = Vec::with_capacity(ids.len() + 1);
        values.push(Value::from(owner.as_str().to_string()));
        values.extend(ids.iter().map(|id| Value::from(id.as_str())));
        self.collect_entries(&sql, values).await
    }

    async fn insert(&self, owner: &UserId, body: &str) -> Result<RemoteEntry> {
        let entry = RemoteEntry {
            id: EntryId::new(),
            owner_id: owner.clone(),
            body: body.to_string(),
            is_favorite: false,
            created_at: unix_millis_now(),
            deleted_at: None,
        };

        self.db
            .connection()
            .execute(
                "INSERT INTO entries (id, owner_id, body, is_favorite, created_at, deleted_at)
                 VALUES (?, ?, ?, 0, ?, NULL)",
                params![
                    entry.id.as_str(),
                    owner.as_str(),
                    body,
                    entry.created_at
                ],
            )
            .await?;

        Ok(entry)
    }

    async fn update(&self, id: &EntryId, patch: &EntryPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut assignments = Vec::new();
        let mut values = Vec::new();
        if let Some(body) = &patch.text {
            assignments.push("body = ?");
            values.push(Value::from(body.clone()));
        }
        if let Some(is_favorite) = patch.is_favorite {
            assignments.push("is_favorite = ?");
            values.push(Value::from(i64::from(is_favorite)));
        }
        values.push(Value::from(id.as_str()));

        let sql = format!(
            "UPDATE entries SET {} WHERE id = ? AND deleted_at IS NULL",
            assignments.join(", ")
        );
        let rows = self
            .db
            .connection()
            .execute(&sql, params_from_iter(values))
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn soft_delete(&self, id: &EntryId) -> Result<()> {
        let rows = self
            .db
            .connection()
            .execute(
                "UPDATE entries SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
                params![unix_millis_now(), id.as_str()],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn hard_delete(&self, id: &EntryId) -> Result<()> {
        let rows = self
            .db
            .connection()
            .execute("DELETE FROM entries WHERE id = ?", params![id.as_str()])
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn merge(&self, source: &UserId, destination: &UserId) -> Result<()> {
        if source == destination {
            return Err(Error::InvalidInput(
                "cannot merge an identity into itself".to_string(),
            ));
        }

        let tx = self.db.connection().transaction().await?;
        let moved = tx
            .execute(
                "UPDATE entries SET owner_id = ? WHERE owner_id = ?",
                params![destination.as_str(), source.as_str()],
            )
            .await?;
        tx.execute(
            "INSERT INTO profiles (user_id, max_streak, updated_at)
             SELECT ?, max_streak, ? FROM profiles WHERE user_id = ?
             ON CONFLICT(user_id) DO UPDATE SET
                max_streak = MAX(profiles.max_streak, excluded.max_streak),
                updated_at = excluded.updated_at",
            params![destination.as_str(), unix_millis_now(), source.as_str()],
        )
        .await?;
        tx.execute(
            "DELETE FROM profiles WHERE user_id = ?",
            params![source.as_str()],
        )
        .await?;
        tx.commit().await?;

        tracing::info!("Merged {} entries from {} into {}", moved, source, destination);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for LibSqlJournalRepository {
    async fn fetch_profile(&self, owner: &UserId) -> Result<Option<Profile>> {
        let mut rows = self
            .db
            .connection()
            .query(
                "SELECT max_streak, updated_at FROM profiles WHERE user_id = ?",
                params![owner.as_str()],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        let max_streak = u32::try_from(row.get::<i64>(0)?).unwrap_or(u32::MAX);
        Ok(Some(Profile {
            user_id: owner.clone(),
            max_streak,
            updated_at: row.get(1)?,
        }))
    }

    async fn save_max_streak(
        &self,
        owner: &UserId,
        max_streak: u32,
        updated_at: i64,
    ) -> Result<()> {
        // Older writes never overwrite newer ones, and the mark never decreases.
        self.db
            .connection()
            .execute(
                "INSERT INTO profiles (user_id, max_streak, updated_at) VALUES (?, ?, ?)
                 ON CONFLICT(user_id) DO UPDATE SET
                    max_streak = MAX(profiles.max_streak, excluded.max_streak),
                    updated_at = excluded.updated_at
                 WHERE excluded.updated_at >= profiles.updated_at",
                params![owner.as_str(), i64::from(max_streak), updated_at],
            )
            .await?;
        Ok(())
    }
}
