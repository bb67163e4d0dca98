//! Collaborator traits for the external data, blob and snapshot services.
//!
//! The pipeline never owns persisted rows long-term: it inserts, reads by
//! filter and (for logs) copies-then-deletes rows owned by the persistence
//! layer. Every method is an I/O boundary and independently fallible.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use cliphub_core::UserId;

use crate::types::{Audience, LogEntry, MediaAsset, Notification};

/// Infrastructure-level store error.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

/// Live log store (`system_logs`).
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Insert one log row. Rows are immutable after insertion.
    async fn insert(&self, entry: LogEntry) -> Result<(), StoreError>;

    /// All rows with `created_at < cutoff`, in insertion order.
    async fn select_older_than(&self, cutoff: DateTime<Utc>)
    -> Result<Vec<LogEntry>, StoreError>;

    /// Delete rows with `created_at < cutoff`; returns the number removed.
    /// Deleting an already-empty range is a no-op, not an error.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Archive log store (`archived_logs`), insert-only from this pipeline.
#[async_trait]
pub trait LogArchive: Send + Sync {
    async fn insert_batch(&self, entries: &[LogEntry]) -> Result<(), StoreError>;
}

/// Notification rows (`notifications`), insert-only from this pipeline.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: Notification) -> Result<(), StoreError>;
}

/// Read-only view over the user-management subsystem.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Users currently opted in to notifications, filtered by audience.
    async fn opted_in_users(&self, audience: Audience) -> Result<Vec<UserId>, StoreError>;

    /// Current opt-in flag for a single user. Re-checked per recipient at
    /// dispatch time, since the flag may change after audience resolution.
    async fn is_opted_in(&self, user_id: UserId) -> Result<bool, StoreError>;
}

/// Enumeration of media assets to back up (`videos`).
#[async_trait]
pub trait MediaCatalog: Send + Sync {
    async fn list_assets(&self) -> Result<Vec<MediaAsset>, StoreError>;
}

/// Object/blob storage service holding media files and backups.
///
/// Only copy-by-reference and buffer upload are exposed to this pipeline.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Copy an existing blob into the backup container.
    async fn copy(&self, container: &str, source_path: &str) -> Result<(), StoreError>;

    /// Upload a buffer into the backup container under `name`.
    async fn upload(&self, container: &str, name: &str, bytes: Vec<u8>) -> Result<(), StoreError>;
}

/// Opaque data-store-level snapshot, delegated entirely to the store.
#[async_trait]
pub trait SnapshotTrigger: Send + Sync {
    async fn trigger_snapshot(&self) -> Result<(), StoreError>;
}
