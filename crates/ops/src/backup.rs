//! One complete backup cycle: snapshot, media copy, settings blob, report.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::audit::{AuditLogger, LogDraft};
use crate::notify::NotificationDispatcher;
use crate::settings::{SettingsProvider, StorageSettings};
use crate::store::{BlobStore, MediaCatalog, SnapshotTrigger, StoreError};
use crate::types::{BackupItemError, BackupOutcome, BackupRecord, MediaAsset, OpsEvent, OpsEventKind};

/// Blob name for the configuration dump written at the end of each cycle.
const SETTINGS_BLOB_NAME: &str = "system_settings_backup.json";

/// Executes backup cycles against the data store and durable storage.
///
/// A cycle is deliberately best-effort, not transactional: per-asset copies
/// fail independently and already-copied assets are never rolled back.
pub struct BackupExecutor {
    settings: Arc<dyn SettingsProvider>,
    snapshot: Arc<dyn SnapshotTrigger>,
    catalog: Arc<dyn MediaCatalog>,
    blobs: Arc<dyn BlobStore>,
    audit: Arc<AuditLogger>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl BackupExecutor {
    pub fn new(
        settings: Arc<dyn SettingsProvider>,
        snapshot: Arc<dyn SnapshotTrigger>,
        catalog: Arc<dyn MediaCatalog>,
        blobs: Arc<dyn BlobStore>,
        audit: Arc<AuditLogger>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            settings,
            snapshot,
            catalog,
            blobs,
            audit,
            dispatcher,
        }
    }

    /// Run one cycle and report its outcome.
    ///
    /// Reporting (one audit row plus one admin-audience dispatch) happens on
    /// every outcome, success included; reporting failures are logged and
    /// swallowed so a cycle always yields its record.
    pub async fn execute(&self) -> BackupRecord {
        let record = self.run_cycle().await;
        self.report(&record).await;
        record
    }

    async fn run_cycle(&self) -> BackupRecord {
        let started_at = Utc::now();

        // Storage settings are read fresh each cycle; they may have been
        // rotated since the schedule was registered.
        let storage = match self.settings.storage_settings().await {
            Ok(s) => s,
            Err(e) => {
                return BackupRecord::phase_failure(
                    started_at,
                    "storage_settings",
                    format!("storage settings unavailable: {e}"),
                );
            }
        };

        if let Err(e) = self.snapshot.trigger_snapshot().await {
            return BackupRecord::phase_failure(
                started_at,
                "database_snapshot",
                format!("data store snapshot failed: {e}"),
            );
        }

        let assets = match self.catalog.list_assets().await {
            Ok(a) => a,
            Err(e) => {
                return BackupRecord::phase_failure(
                    started_at,
                    "asset_enumeration",
                    format!("media enumeration failed: {e}"),
                );
            }
        };

        let mut errors = Vec::new();
        let mut copied = 0usize;
        for asset in &assets {
            match self.copy_asset(&storage, asset).await {
                Ok(()) => copied += 1,
                Err(e) => {
                    warn!(asset_id = %asset.id, error = %e, "asset copy failed");
                    errors.push(BackupItemError {
                        item: asset.id.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        // Settings blob is best-effort and runs after the media loop; its
        // failure does not demote the cycle outcome.
        let settings_backed_up = match self.backup_settings_blob(&storage).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "settings blob upload failed");
                false
            }
        };

        BackupRecord {
            started_at,
            finished_at: Utc::now(),
            outcome: BackupRecord::classify_pass(errors.len()),
            assets_attempted: assets.len(),
            items_copied: copied,
            errors,
            settings_backed_up,
        }
    }

    async fn copy_asset(
        &self,
        storage: &StorageSettings,
        asset: &MediaAsset,
    ) -> Result<(), StoreError> {
        self.blobs.copy(&storage.container, &asset.file_path).await?;
        self.blobs
            .copy(&storage.container, &asset.thumbnail_path)
            .await?;
        Ok(())
    }

    async fn backup_settings_blob(&self, storage: &StorageSettings) -> Result<(), StoreError> {
        let snapshot = self.settings.settings_snapshot().await?;
        let bytes = serde_json::to_vec(&snapshot)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.blobs
            .upload(&storage.container, SETTINGS_BLOB_NAME, bytes)
            .await
    }

    async fn report(&self, record: &BackupRecord) {
        let (event_type, kind, description) = match record.outcome {
            BackupOutcome::Success => (
                "backup",
                OpsEventKind::BackupCompleted,
                format!(
                    "system backup completed: {} of {} assets copied",
                    record.items_copied, record.assets_attempted
                ),
            ),
            BackupOutcome::PartialFailure => (
                "backup",
                OpsEventKind::BackupFailed,
                format!(
                    "system backup partially failed: {} of {} assets copied, {} failed",
                    record.items_copied,
                    record.assets_attempted,
                    record.errors.len()
                ),
            ),
            BackupOutcome::Failure => (
                "backup_error",
                OpsEventKind::BackupFailed,
                format!(
                    "system backup failed: {}",
                    record
                        .errors
                        .first()
                        .map(|e| e.error.as_str())
                        .unwrap_or("unknown error")
                ),
            ),
        };

        info!(
            outcome = ?record.outcome,
            attempted = record.assets_attempted,
            copied = record.items_copied,
            failed = record.errors.len(),
            "backup cycle finished"
        );

        if let Err(e) = self
            .audit
            .record(LogDraft::new(event_type, description.clone()))
            .await
        {
            warn!(error = %e, "could not write backup audit row");
        }

        let event = OpsEvent::new(kind, description).with_detail(
            serde_json::to_value(record).unwrap_or(serde_json::Value::Null),
        );
        if let Err(e) = self.dispatcher.dispatch(&event).await {
            warn!(error = %e, "could not dispatch backup notification");
        }
    }
}
