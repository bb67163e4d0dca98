//! Cross-component tests for the operational pipeline.
//!
//! Wires the real components over the in-memory adapters (plus local failing
//! doubles) and verifies the pipeline's observable properties: overlap
//! skipping, per-asset failure accounting, archive ordering and idempotence,
//! best-effort fan-out, and security escalation.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    use cliphub_core::{LogEntryId, UserId};
    use cliphub_ops::archiver::LogArchiver;
    use cliphub_ops::audit::{AuditLogger, LogDraft};
    use cliphub_ops::backup::BackupExecutor;
    use cliphub_ops::notify::{
        FALLBACK_MESSAGE, NotificationComposer, NotificationDispatcher, TextGenError,
        TextGenerator,
    };
    use cliphub_ops::scheduler::{BackupScheduler, ScheduleError};
    use cliphub_ops::settings::{BackupSettings, StorageSettings};
    use cliphub_ops::store::{
        BlobStore, LogArchive, LogStore, NotificationStore, SnapshotTrigger, StoreError,
        UserDirectory,
    };
    use cliphub_ops::types::{
        Audience, BackupOutcome, LogEntry, MediaAsset, Notification, OpsEvent, OpsEventKind, Role,
    };

    use crate::gentext::StaticTextGenerator;
    use crate::memory::{
        InMemoryBlobStore, InMemoryLogArchive, InMemoryLogStore, InMemoryMediaCatalog,
        InMemoryNotificationStore, InMemorySettings, InMemorySnapshot, InMemoryUserDirectory,
    };

    // ---- local failing doubles ------------------------------------------

    struct FailingSnapshot;

    #[async_trait]
    impl SnapshotTrigger for FailingSnapshot {
        async fn trigger_snapshot(&self) -> Result<(), StoreError> {
            Err(StoreError::unavailable("snapshot rpc refused"))
        }
    }

    /// Snapshot that takes long enough for further ticks to fire.
    struct SlowSnapshot {
        inner: Arc<InMemorySnapshot>,
        delay: StdDuration,
    }

    #[async_trait]
    impl SnapshotTrigger for SlowSnapshot {
        async fn trigger_snapshot(&self) -> Result<(), StoreError> {
            self.inner.trigger_snapshot().await?;
            tokio::time::sleep(self.delay).await;
            Ok(())
        }
    }

    /// Blob store that refuses any path containing "bad".
    struct FlakyBlobStore {
        inner: Arc<InMemoryBlobStore>,
    }

    #[async_trait]
    impl BlobStore for FlakyBlobStore {
        async fn copy(&self, container: &str, source_path: &str) -> Result<(), StoreError> {
            if source_path.contains("bad") {
                return Err(StoreError::unavailable("blob copy refused"));
            }
            self.inner.copy(container, source_path).await
        }

        async fn upload(
            &self,
            container: &str,
            name: &str,
            bytes: Vec<u8>,
        ) -> Result<(), StoreError> {
            self.inner.upload(container, name, bytes).await
        }
    }

    struct FailingArchive;

    #[async_trait]
    impl LogArchive for FailingArchive {
        async fn insert_batch(&self, _entries: &[LogEntry]) -> Result<(), StoreError> {
            Err(StoreError::unavailable("archive store down"))
        }
    }

    /// Notification store that fails for a chosen set of recipients.
    struct PickyNotificationStore {
        inner: Arc<InMemoryNotificationStore>,
        reject: HashSet<UserId>,
    }

    #[async_trait]
    impl NotificationStore for PickyNotificationStore {
        async fn insert(&self, notification: Notification) -> Result<(), StoreError> {
            if self.reject.contains(&notification.user_id) {
                return Err(StoreError::unavailable("notification insert refused"));
            }
            self.inner.insert(notification).await
        }
    }

    /// Directory whose audience snapshot is stale: one user still resolves
    /// into the audience but reports opted-out on the per-recipient check.
    struct StaleDirectory {
        inner: Arc<InMemoryUserDirectory>,
        opting_out: UserId,
    }

    #[async_trait]
    impl UserDirectory for StaleDirectory {
        async fn opted_in_users(&self, audience: Audience) -> Result<Vec<UserId>, StoreError> {
            self.inner.opted_in_users(audience).await
        }

        async fn is_opted_in(&self, user_id: UserId) -> Result<bool, StoreError> {
            if user_id == self.opting_out {
                return Ok(false);
            }
            self.inner.is_opted_in(user_id).await
        }
    }

    struct OfflineGenerator;

    #[async_trait]
    impl TextGenerator for OfflineGenerator {
        async fn generate(&self, _instruction: &str, _prompt: &str) -> Result<String, TextGenError> {
            Err(TextGenError("model offline".to_string()))
        }
    }

    // ---- harness ---------------------------------------------------------

    struct Stores {
        logs: Arc<InMemoryLogStore>,
        archive: Arc<InMemoryLogArchive>,
        notifications: Arc<InMemoryNotificationStore>,
        users: Arc<InMemoryUserDirectory>,
        catalog: Arc<InMemoryMediaCatalog>,
        blobs: Arc<InMemoryBlobStore>,
        snapshot: Arc<InMemorySnapshot>,
        settings: Arc<InMemorySettings>,
    }

    fn stores_with_cadence(cadence: &str) -> Stores {
        Stores {
            logs: InMemoryLogStore::arc(),
            archive: InMemoryLogArchive::arc(),
            notifications: InMemoryNotificationStore::arc(),
            users: InMemoryUserDirectory::arc(),
            catalog: InMemoryMediaCatalog::arc(),
            blobs: InMemoryBlobStore::arc(),
            snapshot: InMemorySnapshot::arc(),
            settings: InMemorySettings::arc(
                BackupSettings {
                    cadence: cadence.to_string(),
                    retention_days: 30,
                },
                StorageSettings {
                    connection: "endpoint=https://blob.test;key=secret".to_string(),
                    container: "backups".to_string(),
                },
            ),
        }
    }

    fn stores() -> Stores {
        // Daily at 03:00.
        stores_with_cadence("0 0 3 * * *")
    }

    struct Pipeline {
        dispatcher: Arc<NotificationDispatcher>,
        archiver: Arc<LogArchiver>,
        audit: Arc<AuditLogger>,
        executor: Arc<BackupExecutor>,
    }

    /// Wire the full component graph, with injectable doubles at the
    /// unreliable seams.
    fn wire(
        s: &Stores,
        snapshot: Arc<dyn SnapshotTrigger>,
        blobs: Arc<dyn BlobStore>,
        notifications: Arc<dyn NotificationStore>,
        generator: Arc<dyn TextGenerator>,
    ) -> Pipeline {
        let composer = NotificationComposer::new(generator);
        let dispatcher = Arc::new(NotificationDispatcher::new(
            s.users.clone(),
            notifications,
            composer,
        ));
        let archiver = Arc::new(LogArchiver::new(s.logs.clone(), s.archive.clone()));
        let audit = Arc::new(AuditLogger::new(
            s.logs.clone(),
            archiver.clone(),
            dispatcher.clone(),
            s.settings.clone(),
        ));
        let executor = Arc::new(BackupExecutor::new(
            s.settings.clone(),
            snapshot,
            s.catalog.clone(),
            blobs,
            audit.clone(),
            dispatcher.clone(),
        ));
        Pipeline {
            dispatcher,
            archiver,
            audit,
            executor,
        }
    }

    fn wire_default(s: &Stores) -> Pipeline {
        wire(
            s,
            s.snapshot.clone(),
            s.blobs.clone(),
            s.notifications.clone(),
            Arc::new(StaticTextGenerator::new("generated message")),
        )
    }

    fn asset(name: &str) -> MediaAsset {
        MediaAsset {
            id: cliphub_core::VideoId::new(),
            file_path: format!("media/{name}.mp4"),
            thumbnail_path: format!("thumbs/{name}.jpg"),
        }
    }

    fn aged_entry(days: i64) -> LogEntry {
        LogEntry {
            id: LogEntryId::new(),
            event_type: "login".to_string(),
            description: "user signed in".to_string(),
            user_id: None,
            source_address: None,
            created_at: Utc::now() - Duration::days(days),
        }
    }

    // ---- backup cycle ----------------------------------------------------

    #[tokio::test]
    async fn empty_catalog_cycle_succeeds_and_reports() {
        let s = stores();
        let admin = UserId::new();
        s.users.add_user(admin, Role::Admin, true);
        s.users.add_user(UserId::new(), Role::Member, true);

        let pipeline = wire_default(&s);
        let record = pipeline.executor.execute().await;

        assert_eq!(record.outcome, BackupOutcome::Success);
        assert_eq!(record.assets_attempted, 0);
        assert_eq!(record.items_copied, 0);
        assert!(record.errors.is_empty());
        assert!(record.settings_backed_up);

        // Dual reporting: one audit row, one admin notification. The
        // opted-in member gets nothing (backup events target admins).
        assert_eq!(s.logs.of_type("backup").len(), 1);
        let rows = s.notifications.all();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, admin);
        assert!(!rows[0].is_read);

        // Settings blob landed, without the storage capability token.
        let blob = s.blobs.uploaded("backups", "system_settings_backup.json").unwrap();
        let json: serde_json::Value = serde_json::from_slice(&blob).unwrap();
        assert!(json["storage_settings"].get("connection").is_none());
    }

    #[tokio::test]
    async fn per_asset_failures_are_recorded_not_fatal() {
        let s = stores();
        s.users.add_user(UserId::new(), Role::Admin, true);

        let good_one = asset("intro");
        let bad_one = asset("bad-take");
        let good_two = asset("outro");
        let bad_two = asset("bad-cut");
        for a in [&good_one, &bad_one, &good_two, &bad_two] {
            s.catalog.add_asset(a.clone());
        }

        let pipeline = wire(
            &s,
            s.snapshot.clone(),
            Arc::new(FlakyBlobStore {
                inner: s.blobs.clone(),
            }),
            s.notifications.clone(),
            Arc::new(StaticTextGenerator::new("generated message")),
        );
        let record = pipeline.executor.execute().await;

        assert_eq!(record.outcome, BackupOutcome::PartialFailure);
        assert_eq!(record.assets_attempted, 4);
        assert_eq!(record.items_copied, 2);
        assert_eq!(record.errors.len(), 2);
        // Failures keep enumeration order.
        assert_eq!(record.errors[0].item, bad_one.id.to_string());
        assert_eq!(record.errors[1].item, bad_two.id.to_string());

        // Already-copied assets stay copied: no rollback.
        let copied = s.blobs.copied_paths();
        assert!(copied.contains(&good_one.file_path));
        assert!(copied.contains(&good_two.file_path));
    }

    #[tokio::test]
    async fn snapshot_failure_aborts_media_loop() {
        let s = stores();
        let admin = UserId::new();
        s.users.add_user(admin, Role::Admin, true);
        s.catalog.add_asset(asset("intro"));

        let pipeline = wire(
            &s,
            Arc::new(FailingSnapshot),
            s.blobs.clone(),
            s.notifications.clone(),
            Arc::new(StaticTextGenerator::new("generated message")),
        );
        let record = pipeline.executor.execute().await;

        assert_eq!(record.outcome, BackupOutcome::Failure);
        assert_eq!(record.assets_attempted, 0);
        assert_eq!(record.items_copied, 0);
        assert!(s.blobs.copied_paths().is_empty());

        // Failure is still dual-reported.
        assert_eq!(s.logs.of_type("backup_error").len(), 1);
        assert_eq!(s.notifications.for_user(admin).len(), 1);
    }

    // ---- log archival ----------------------------------------------------

    #[tokio::test]
    async fn archival_moves_aged_rows_then_is_idempotent() {
        let s = stores();
        let pipeline = wire_default(&s);

        for days in [45, 40, 35] {
            s.logs.insert(aged_entry(days)).await.unwrap();
        }
        s.logs.insert(aged_entry(1)).await.unwrap();

        let first = pipeline.archiver.archive(Duration::days(30)).await.unwrap();
        assert_eq!(first.moved, 3);
        assert_eq!(s.archive.all().len(), 3);
        assert_eq!(s.logs.all().len(), 1);

        // No new qualifying rows: second pass inserts and deletes nothing.
        let second = pipeline.archiver.archive(Duration::days(30)).await.unwrap();
        assert_eq!(second.moved, 0);
        assert_eq!(s.archive.all().len(), 3);
        assert_eq!(s.logs.all().len(), 1);
    }

    #[tokio::test]
    async fn failed_archive_insert_deletes_nothing() {
        let s = stores();
        for days in [45, 40] {
            s.logs.insert(aged_entry(days)).await.unwrap();
        }

        let archiver = LogArchiver::new(s.logs.clone(), Arc::new(FailingArchive));
        let result = archiver.archive(Duration::days(30)).await;

        assert!(result.is_err());
        // Insert-before-delete: the live store keeps every targeted row.
        assert_eq!(s.logs.all().len(), 2);
    }

    #[tokio::test]
    async fn audit_record_triggers_opportunistic_archival() {
        let s = stores();
        let pipeline = wire_default(&s);

        s.logs.insert(aged_entry(60)).await.unwrap();
        pipeline
            .audit
            .record(LogDraft::new("login", "user signed in"))
            .await
            .unwrap();

        assert_eq!(s.archive.all().len(), 1);
        // The fresh row survives the pass.
        assert_eq!(s.logs.of_type("login").len(), 1);
    }

    // ---- notification fan-out ---------------------------------------------

    #[tokio::test]
    async fn fan_out_survives_recipient_failures() {
        let s = stores();
        let mut members = Vec::new();
        for _ in 0..5 {
            let id = UserId::new();
            s.users.add_user(id, Role::Member, true);
            members.push(id);
        }
        let reject: HashSet<UserId> = members.iter().take(2).copied().collect();

        let pipeline = wire(
            &s,
            s.snapshot.clone(),
            s.blobs.clone(),
            Arc::new(PickyNotificationStore {
                inner: s.notifications.clone(),
                reject: reject.clone(),
            }),
            Arc::new(StaticTextGenerator::new("generated message")),
        );

        let event = OpsEvent::new(OpsEventKind::ContentUpdate, "new video published");
        let outcome = pipeline.dispatcher.dispatch(&event).await.unwrap();

        assert_eq!(outcome.audience_size, 5);
        assert_eq!(outcome.delivered, 3);
        assert_eq!(outcome.failed, 2);
        assert_eq!(s.notifications.all().len(), 3);
        for rejected in &reject {
            assert!(s.notifications.for_user(*rejected).is_empty());
        }
    }

    #[tokio::test]
    async fn opt_out_after_resolution_is_respected() {
        let s = stores();
        let staying = UserId::new();
        let leaving = UserId::new();
        s.users.add_user(staying, Role::Member, true);
        s.users.add_user(leaving, Role::Member, true);

        // `leaving` is still in the resolved audience but the per-recipient
        // re-check sees the newer opted-out flag.
        let directory = Arc::new(StaleDirectory {
            inner: s.users.clone(),
            opting_out: leaving,
        });
        let composer =
            NotificationComposer::new(Arc::new(StaticTextGenerator::new("generated message")));
        let dispatcher =
            NotificationDispatcher::new(directory, s.notifications.clone(), composer);

        let event = OpsEvent::new(OpsEventKind::ContentUpdate, "new video published");
        let outcome = dispatcher.dispatch(&event).await.unwrap();

        assert_eq!(outcome.audience_size, 2);
        assert_eq!(outcome.delivered, 1);
        assert_eq!(outcome.skipped, 1);
        assert!(s.notifications.for_user(leaving).is_empty());
        assert_eq!(s.notifications.for_user(staying).len(), 1);
    }

    // ---- audit logger ------------------------------------------------------

    #[tokio::test]
    async fn security_event_escalates_with_fallback_message() {
        let s = stores();
        let admin = UserId::new();
        let suspect = UserId::new();
        s.users.add_user(admin, Role::Admin, true);
        s.users.add_user(suspect, Role::Member, true);

        // Generator down: escalation must still go out, with the fallback.
        let pipeline = wire(
            &s,
            s.snapshot.clone(),
            s.blobs.clone(),
            s.notifications.clone(),
            Arc::new(OfflineGenerator),
        );

        let entry = pipeline
            .audit
            .record(
                LogDraft::new("unauthorized_access", "token reuse detected")
                    .with_user(suspect)
                    .with_source_address("203.0.113.9"),
            )
            .await
            .unwrap();

        assert_eq!(entry.event_type, "unauthorized_access");
        assert_eq!(s.logs.of_type("unauthorized_access").len(), 1);

        let admin_rows = s.notifications.for_user(admin);
        assert_eq!(admin_rows.len(), 1);
        assert_eq!(admin_rows[0].message, FALLBACK_MESSAGE);
        // The suspect is not in the admin audience.
        assert!(s.notifications.for_user(suspect).is_empty());
    }

    #[tokio::test]
    async fn plain_event_does_not_escalate() {
        let s = stores();
        s.users.add_user(UserId::new(), Role::Admin, true);

        let pipeline = wire_default(&s);
        pipeline
            .audit
            .record(LogDraft::new("login", "user signed in"))
            .await
            .unwrap();

        assert!(s.notifications.all().is_empty());
    }

    // ---- scheduler -----------------------------------------------------------

    #[tokio::test]
    async fn malformed_cadence_fails_at_start() {
        let s = stores_with_cadence("whenever feels right");
        let pipeline = wire_default(&s);
        let scheduler =
            BackupScheduler::new(s.settings.clone(), pipeline.executor.clone(), pipeline.audit.clone());

        let err = scheduler.start().await.unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidCadence { .. }));
        // Nothing ran.
        assert_eq!(s.snapshot.snapshots_taken(), 0);
    }

    #[tokio::test]
    async fn stopped_schedule_fires_no_ticks() {
        let s = stores();
        let pipeline = wire_default(&s);
        let scheduler =
            BackupScheduler::new(s.settings.clone(), pipeline.executor.clone(), pipeline.audit.clone());

        let handle = scheduler.start().await.unwrap();
        handle.shutdown().await;

        assert_eq!(s.snapshot.snapshots_taken(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn overlapping_ticks_are_skipped() {
        // Every second, with a cycle that takes far longer than a second.
        let s = stores_with_cadence("* * * * * *");
        let slow = Arc::new(SlowSnapshot {
            inner: s.snapshot.clone(),
            delay: StdDuration::from_secs(10),
        });
        let pipeline = wire(
            &s,
            slow,
            s.blobs.clone(),
            s.notifications.clone(),
            Arc::new(StaticTextGenerator::new("generated message")),
        );
        let scheduler =
            BackupScheduler::new(s.settings.clone(), pipeline.executor.clone(), pipeline.audit.clone());

        let handle = scheduler.start().await.unwrap();
        tokio::time::sleep(StdDuration::from_millis(2600)).await;
        handle.shutdown().await;

        // Exactly one cycle in flight; later ticks were skipped and logged.
        assert_eq!(s.snapshot.snapshots_taken(), 1);
        assert!(!s.logs.of_type("backup_skipped_overlap").is_empty());
    }
}
