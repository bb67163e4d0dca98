//! In-memory store implementations for tests and dev wiring.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use cliphub_core::UserId;
use cliphub_ops::settings::{BackupSettings, SettingsProvider, StorageSettings};
use cliphub_ops::store::{
    BlobStore, LogArchive, LogStore, MediaCatalog, NotificationStore, SnapshotTrigger, StoreError,
    UserDirectory,
};
use cliphub_ops::types::{Audience, LogEntry, MediaAsset, Notification, Role};

/// In-memory live log store.
#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    entries: RwLock<Vec<LogEntry>>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn all(&self) -> Vec<LogEntry> {
        self.entries.read().unwrap().clone()
    }

    pub fn of_type(&self, event_type: &str) -> Vec<LogEntry> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    async fn insert(&self, entry: LogEntry) -> Result<(), StoreError> {
        self.entries.write().unwrap().push(entry);
        Ok(())
    }

    async fn select_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<LogEntry>, StoreError> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.created_at < cutoff)
            .cloned()
            .collect())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|e| e.created_at >= cutoff);
        Ok((before - entries.len()) as u64)
    }
}

/// In-memory archive store.
#[derive(Debug, Default)]
pub struct InMemoryLogArchive {
    entries: RwLock<Vec<LogEntry>>,
}

impl InMemoryLogArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn all(&self) -> Vec<LogEntry> {
        self.entries.read().unwrap().clone()
    }
}

#[async_trait]
impl LogArchive for InMemoryLogArchive {
    async fn insert_batch(&self, entries: &[LogEntry]) -> Result<(), StoreError> {
        self.entries.write().unwrap().extend_from_slice(entries);
        Ok(())
    }
}

/// In-memory notification store.
#[derive(Debug, Default)]
pub struct InMemoryNotificationStore {
    rows: RwLock<Vec<Notification>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn all(&self) -> Vec<Notification> {
        self.rows.read().unwrap().clone()
    }

    pub fn for_user(&self, user_id: UserId) -> Vec<Notification> {
        self.rows
            .read()
            .unwrap()
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn insert(&self, notification: Notification) -> Result<(), StoreError> {
        self.rows.write().unwrap().push(notification);
        Ok(())
    }
}

/// One user record as the directory sees it.
#[derive(Debug, Clone, Copy)]
struct UserRecord {
    role: Role,
    opted_in: bool,
}

/// In-memory read-only view over user management.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, UserRecord>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn add_user(&self, user_id: UserId, role: Role, opted_in: bool) {
        self.users
            .write()
            .unwrap()
            .insert(user_id, UserRecord { role, opted_in });
    }

    /// Flip an opt-in flag, e.g. between audience resolution and delivery.
    pub fn set_opt_in(&self, user_id: UserId, opted_in: bool) {
        if let Some(record) = self.users.write().unwrap().get_mut(&user_id) {
            record.opted_in = opted_in;
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn opted_in_users(&self, audience: Audience) -> Result<Vec<UserId>, StoreError> {
        let users = self.users.read().unwrap();
        let mut ids: Vec<UserId> = users
            .iter()
            .filter(|(_, r)| {
                r.opted_in
                    && match audience {
                        Audience::Admins => r.role == Role::Admin,
                        Audience::AllOptedIn => true,
                    }
            })
            .map(|(id, _)| *id)
            .collect();
        // Deterministic order for tests and stable fan-out logs.
        ids.sort_by_key(|id| *id.as_uuid());
        Ok(ids)
    }

    async fn is_opted_in(&self, user_id: UserId) -> Result<bool, StoreError> {
        self.users
            .read()
            .unwrap()
            .get(&user_id)
            .map(|r| r.opted_in)
            .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))
    }
}

/// In-memory media catalog.
#[derive(Debug, Default)]
pub struct InMemoryMediaCatalog {
    assets: RwLock<Vec<MediaAsset>>,
}

impl InMemoryMediaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn add_asset(&self, asset: MediaAsset) {
        self.assets.write().unwrap().push(asset);
    }
}

#[async_trait]
impl MediaCatalog for InMemoryMediaCatalog {
    async fn list_assets(&self) -> Result<Vec<MediaAsset>, StoreError> {
        Ok(self.assets.read().unwrap().clone())
    }
}

/// In-memory blob store recording copies and uploads.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    copies: RwLock<Vec<(String, String)>>,
    uploads: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn copied_paths(&self) -> Vec<String> {
        self.copies
            .read()
            .unwrap()
            .iter()
            .map(|(_, path)| path.clone())
            .collect()
    }

    pub fn uploaded(&self, container: &str, name: &str) -> Option<Vec<u8>> {
        self.uploads
            .read()
            .unwrap()
            .get(&format!("{container}/{name}"))
            .cloned()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn copy(&self, container: &str, source_path: &str) -> Result<(), StoreError> {
        self.copies
            .write()
            .unwrap()
            .push((container.to_string(), source_path.to_string()));
        Ok(())
    }

    async fn upload(&self, container: &str, name: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.uploads
            .write()
            .unwrap()
            .insert(format!("{container}/{name}"), bytes);
        Ok(())
    }
}

/// In-memory snapshot trigger counting invocations.
#[derive(Debug, Default)]
pub struct InMemorySnapshot {
    count: RwLock<usize>,
}

impl InMemorySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn snapshots_taken(&self) -> usize {
        *self.count.read().unwrap()
    }
}

#[async_trait]
impl SnapshotTrigger for InMemorySnapshot {
    async fn trigger_snapshot(&self) -> Result<(), StoreError> {
        *self.count.write().unwrap() += 1;
        Ok(())
    }
}

/// Fixed in-memory configuration records.
#[derive(Debug)]
pub struct InMemorySettings {
    backup: RwLock<BackupSettings>,
    storage: StorageSettings,
}

impl InMemorySettings {
    pub fn new(backup: BackupSettings, storage: StorageSettings) -> Self {
        Self {
            backup: RwLock::new(backup),
            storage,
        }
    }

    pub fn arc(backup: BackupSettings, storage: StorageSettings) -> Arc<Self> {
        Arc::new(Self::new(backup, storage))
    }

    pub fn set_backup_settings(&self, backup: BackupSettings) {
        *self.backup.write().unwrap() = backup;
    }
}

#[async_trait]
impl SettingsProvider for InMemorySettings {
    async fn backup_settings(&self) -> Result<BackupSettings, StoreError> {
        Ok(self.backup.read().unwrap().clone())
    }

    async fn storage_settings(&self) -> Result<StorageSettings, StoreError> {
        Ok(self.storage.clone())
    }

    async fn settings_snapshot(&self) -> Result<serde_json::Value, StoreError> {
        let backup = self.backup.read().unwrap().clone();
        // The storage descriptor is a capability token; the settings blob
        // carries only the non-secret rows.
        Ok(serde_json::json!({
            "backup_settings": backup,
            "storage_settings": { "container": self.storage.container },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use cliphub_core::LogEntryId;

    fn entry_aged(days: i64) -> LogEntry {
        LogEntry {
            id: LogEntryId::new(),
            event_type: "login".to_string(),
            description: "user signed in".to_string(),
            user_id: None,
            source_address: None,
            created_at: Utc::now() - Duration::days(days),
        }
    }

    #[tokio::test]
    async fn log_store_filters_by_cutoff() {
        let store = InMemoryLogStore::new();
        store.insert(entry_aged(40)).await.unwrap();
        store.insert(entry_aged(10)).await.unwrap();
        store.insert(entry_aged(0)).await.unwrap();

        let cutoff = Utc::now() - Duration::days(30);
        let aged = store.select_older_than(cutoff).await.unwrap();
        assert_eq!(aged.len(), 1);

        let deleted = store.delete_older_than(cutoff).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.all().len(), 2);

        // Same filter again matches nothing.
        assert_eq!(store.delete_older_than(cutoff).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn directory_resolves_audiences() {
        let dir = InMemoryUserDirectory::new();
        let admin = UserId::new();
        let member = UserId::new();
        let lurker = UserId::new();
        dir.add_user(admin, Role::Admin, true);
        dir.add_user(member, Role::Member, true);
        dir.add_user(lurker, Role::Member, false);

        let admins = dir.opted_in_users(Audience::Admins).await.unwrap();
        assert_eq!(admins, vec![admin]);

        let everyone = dir.opted_in_users(Audience::AllOptedIn).await.unwrap();
        assert_eq!(everyone.len(), 2);
        assert!(!everyone.contains(&lurker));
    }

    #[tokio::test]
    async fn directory_reports_missing_user() {
        let dir = InMemoryUserDirectory::new();
        let err = dir.is_opted_in(UserId::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn blob_store_records_uploads() {
        let blobs = InMemoryBlobStore::new();
        blobs
            .upload("backups", "settings.json", b"{}".to_vec())
            .await
            .unwrap();
        assert_eq!(blobs.uploaded("backups", "settings.json").unwrap(), b"{}");
        assert!(blobs.uploaded("backups", "other.json").is_none());
    }
}
