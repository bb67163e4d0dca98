//! Postgres-backed store adapters.
//!
//! Runtime `sqlx` queries over the tables owned by the relational data
//! store: `system_logs`, `archived_logs`, `notifications`, `users`,
//! `videos` and `system_settings`. This pipeline issues point reads,
//! filtered range reads, inserts and filtered deletes only; no schema
//! migration logic lives here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use cliphub_core::{LogEntryId, NotificationId, UserId, VideoId};
use cliphub_ops::settings::{BackupSettings, SettingsProvider, StorageSettings};
use cliphub_ops::store::{
    LogArchive, LogStore, MediaCatalog, NotificationStore, SnapshotTrigger, StoreError,
    UserDirectory,
};
use cliphub_ops::types::{Audience, LogEntry, MediaAsset, Notification};

fn store_err(context: &str, e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(format!("{context}: {e}"))
}

fn log_entry_from_row(row: &sqlx::postgres::PgRow) -> Result<LogEntry, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Serialization(format!("log row decode: {e}"));
    Ok(LogEntry {
        id: LogEntryId::from_uuid(row.try_get::<Uuid, _>("id").map_err(decode)?),
        event_type: row.try_get("event_type").map_err(decode)?,
        description: row.try_get("description").map_err(decode)?,
        user_id: row
            .try_get::<Option<Uuid>, _>("user_id")
            .map_err(decode)?
            .map(UserId::from_uuid),
        source_address: row.try_get("source_address").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
    })
}

/// Live log rows in `system_logs`.
#[derive(Debug, Clone)]
pub struct PostgresLogStore {
    pool: PgPool,
}

impl PostgresLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogStore for PostgresLogStore {
    async fn insert(&self, entry: LogEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO system_logs (id, event_type, description, user_id, source_address, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(entry.id.as_uuid())
        .bind(&entry.event_type)
        .bind(&entry.description)
        .bind(entry.user_id.map(Uuid::from))
        .bind(&entry.source_address)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| store_err("insert system_logs", e))?;
        Ok(())
    }

    async fn select_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<LogEntry>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, event_type, description, user_id, source_address, created_at \
             FROM system_logs WHERE created_at < $1 ORDER BY created_at ASC",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_err("select system_logs", e))?;

        rows.iter().map(log_entry_from_row).collect()
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM system_logs WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| store_err("delete system_logs", e))?;
        Ok(result.rows_affected())
    }
}

/// Archived log rows in `archived_logs`.
#[derive(Debug, Clone)]
pub struct PostgresLogArchive {
    pool: PgPool,
}

impl PostgresLogArchive {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogArchive for PostgresLogArchive {
    async fn insert_batch(&self, entries: &[LogEntry]) -> Result<(), StoreError> {
        // One transaction per batch: the archiver relies on the whole batch
        // landing before it deletes anything from the live store.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_err("begin archive batch", e))?;

        for entry in entries {
            sqlx::query(
                "INSERT INTO archived_logs (id, event_type, description, user_id, source_address, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (id) DO NOTHING",
            )
            .bind(entry.id.as_uuid())
            .bind(&entry.event_type)
            .bind(&entry.description)
            .bind(entry.user_id.map(Uuid::from))
            .bind(&entry.source_address)
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| store_err("insert archived_logs", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| store_err("commit archive batch", e))?;
        Ok(())
    }
}

/// Notification rows in `notifications`.
#[derive(Debug, Clone)]
pub struct PostgresNotificationStore {
    pool: PgPool,
}

impl PostgresNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PostgresNotificationStore {
    async fn insert(&self, notification: Notification) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, message, is_read, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(notification.id.as_uuid())
        .bind(notification.user_id.as_uuid())
        .bind(&notification.message)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| store_err("insert notifications", e))?;
        Ok(())
    }
}

/// Read-only view over the `users` table.
#[derive(Debug, Clone)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn opted_in_users(&self, audience: Audience) -> Result<Vec<UserId>, StoreError> {
        let rows = match audience {
            Audience::Admins => {
                sqlx::query(
                    "SELECT id FROM users WHERE notifications_enabled AND role = 'admin' ORDER BY id",
                )
                .fetch_all(&self.pool)
                .await
            }
            Audience::AllOptedIn => {
                sqlx::query("SELECT id FROM users WHERE notifications_enabled ORDER BY id")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| store_err("select users", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<Uuid, _>("id")
                    .map(UserId::from_uuid)
                    .map_err(|e| StoreError::Serialization(format!("user row decode: {e}")))
            })
            .collect()
    }

    async fn is_opted_in(&self, user_id: UserId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT notifications_enabled FROM users WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_err("select user", e))?;

        match row {
            Some(row) => row
                .try_get("notifications_enabled")
                .map_err(|e| StoreError::Serialization(format!("user row decode: {e}"))),
            None => Err(StoreError::NotFound(format!("user {user_id}"))),
        }
    }
}

/// Media asset enumeration over the `videos` table.
#[derive(Debug, Clone)]
pub struct PostgresMediaCatalog {
    pool: PgPool,
}

impl PostgresMediaCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaCatalog for PostgresMediaCatalog {
    async fn list_assets(&self) -> Result<Vec<MediaAsset>, StoreError> {
        let rows = sqlx::query("SELECT id, file_path, thumbnail_path FROM videos ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_err("select videos", e))?;

        rows.iter()
            .map(|row| {
                let decode =
                    |e: sqlx::Error| StoreError::Serialization(format!("video row decode: {e}"));
                Ok(MediaAsset {
                    id: VideoId::from_uuid(row.try_get::<Uuid, _>("id").map_err(decode)?),
                    file_path: row.try_get("file_path").map_err(decode)?,
                    thumbnail_path: row.try_get("thumbnail_path").map_err(decode)?,
                })
            })
            .collect()
    }
}

/// Configuration records in `system_settings` (key/value JSON rows).
#[derive(Debug, Clone)]
pub struct PostgresSettingsProvider {
    pool: PgPool,
}

impl PostgresSettingsProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn setting(&self, key: &str) -> Result<serde_json::Value, StoreError> {
        let row = sqlx::query("SELECT value FROM system_settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_err("select system_settings", e))?
            .ok_or_else(|| StoreError::NotFound(format!("setting {key}")))?;

        row.try_get("value")
            .map_err(|e| StoreError::Serialization(format!("setting row decode: {e}")))
    }
}

#[async_trait]
impl SettingsProvider for PostgresSettingsProvider {
    async fn backup_settings(&self) -> Result<BackupSettings, StoreError> {
        let value = self.setting("backup_settings").await?;
        serde_json::from_value(value)
            .map_err(|e| StoreError::Serialization(format!("backup_settings: {e}")))
    }

    async fn storage_settings(&self) -> Result<StorageSettings, StoreError> {
        let value = self.setting("storage_settings").await?;
        serde_json::from_value(value)
            .map_err(|e| StoreError::Serialization(format!("storage_settings: {e}")))
    }

    async fn settings_snapshot(&self) -> Result<serde_json::Value, StoreError> {
        let rows = sqlx::query("SELECT key, value FROM system_settings WHERE key <> 'storage_settings'")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_err("select system_settings", e))?;

        let mut snapshot = serde_json::Map::new();
        for row in rows {
            let decode =
                |e: sqlx::Error| StoreError::Serialization(format!("setting row decode: {e}"));
            let key: String = row.try_get("key").map_err(decode)?;
            let value: serde_json::Value = row.try_get("value").map_err(decode)?;
            snapshot.insert(key, value);
        }
        Ok(serde_json::Value::Object(snapshot))
    }
}

/// Data-store-level snapshot via the store's own backup function.
#[derive(Debug, Clone)]
pub struct PostgresSnapshot {
    pool: PgPool,
}

impl PostgresSnapshot {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotTrigger for PostgresSnapshot {
    async fn trigger_snapshot(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT backup_database()")
            .execute(&self.pool)
            .await
            .map_err(|e| store_err("backup_database", e))?;
        Ok(())
    }
}
