//! Component wiring for the HTTP process.
//!
//! Default wiring is fully in-memory (dev/test). When `DATABASE_URL` is set
//! the data-store-backed traits switch to the Postgres adapters; blob storage
//! stays in-memory (the real blob service is external to this process).

use std::sync::{Arc, Mutex};

use sqlx::PgPool;

use cliphub_infra::gentext::{HttpTextGenerator, StaticTextGenerator};
use cliphub_infra::memory::{
    InMemoryBlobStore, InMemoryLogArchive, InMemoryLogStore, InMemoryMediaCatalog,
    InMemoryNotificationStore, InMemorySettings, InMemorySnapshot, InMemoryUserDirectory,
};
use cliphub_infra::postgres::{
    PostgresLogArchive, PostgresLogStore, PostgresMediaCatalog, PostgresNotificationStore,
    PostgresSettingsProvider, PostgresSnapshot, PostgresUserDirectory,
};
use cliphub_ops::archiver::LogArchiver;
use cliphub_ops::audit::AuditLogger;
use cliphub_ops::backup::BackupExecutor;
use cliphub_ops::notify::{
    FALLBACK_MESSAGE, NotificationComposer, NotificationDispatcher, TextGenerator,
};
use cliphub_ops::scheduler::{BackupScheduler, SchedulerHandle};
use cliphub_ops::settings::{BackupSettings, SettingsProvider, StorageSettings};
use cliphub_ops::store::{
    BlobStore, LogArchive, LogStore, MediaCatalog, NotificationStore, SnapshotTrigger,
    UserDirectory,
};

/// The wired pipeline components shared by every handler.
pub struct AppServices {
    pub audit: Arc<AuditLogger>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub executor: Arc<BackupExecutor>,
    pub scheduler: Arc<BackupScheduler>,
    /// Handle of the currently registered backup schedule, if any.
    pub schedule_handle: Mutex<Option<SchedulerHandle>>,
}

pub async fn build_services() -> AppServices {
    match std::env::var("DATABASE_URL") {
        Ok(url) => build_postgres_services(&url).await,
        Err(_) => build_in_memory_services(),
    }
}

fn text_generator() -> Arc<dyn TextGenerator> {
    match std::env::var("GENTEXT_ENDPOINT") {
        Ok(endpoint) => Arc::new(HttpTextGenerator::new(endpoint)),
        Err(_) => {
            tracing::warn!("GENTEXT_ENDPOINT not set; notifications use the static fallback text");
            Arc::new(StaticTextGenerator::new(FALLBACK_MESSAGE))
        }
    }
}

pub fn build_in_memory_services() -> AppServices {
    let settings = InMemorySettings::arc(
        BackupSettings {
            cadence: "0 0 3 * * *".to_string(),
            retention_days: 30,
        },
        StorageSettings {
            connection: "in-memory".to_string(),
            container: "backups".to_string(),
        },
    );

    assemble(
        settings,
        InMemorySnapshot::arc(),
        InMemoryMediaCatalog::arc(),
        InMemoryBlobStore::arc(),
        InMemoryLogStore::arc(),
        InMemoryLogArchive::arc(),
        InMemoryNotificationStore::arc(),
        InMemoryUserDirectory::arc(),
        text_generator(),
    )
}

async fn build_postgres_services(database_url: &str) -> AppServices {
    let pool = PgPool::connect(database_url)
        .await
        .expect("failed to connect to Postgres");

    assemble(
        Arc::new(PostgresSettingsProvider::new(pool.clone())),
        Arc::new(PostgresSnapshot::new(pool.clone())),
        Arc::new(PostgresMediaCatalog::new(pool.clone())),
        InMemoryBlobStore::arc(),
        Arc::new(PostgresLogStore::new(pool.clone())),
        Arc::new(PostgresLogArchive::new(pool.clone())),
        Arc::new(PostgresNotificationStore::new(pool.clone())),
        Arc::new(PostgresUserDirectory::new(pool)),
        text_generator(),
    )
}

#[allow(clippy::too_many_arguments)]
fn assemble(
    settings: Arc<dyn SettingsProvider>,
    snapshot: Arc<dyn SnapshotTrigger>,
    catalog: Arc<dyn MediaCatalog>,
    blobs: Arc<dyn BlobStore>,
    logs: Arc<dyn LogStore>,
    archive: Arc<dyn LogArchive>,
    notifications: Arc<dyn NotificationStore>,
    users: Arc<dyn UserDirectory>,
    generator: Arc<dyn TextGenerator>,
) -> AppServices {
    let composer = NotificationComposer::new(generator);
    let dispatcher = Arc::new(NotificationDispatcher::new(users, notifications, composer));
    let archiver = Arc::new(LogArchiver::new(logs.clone(), archive));
    let audit = Arc::new(AuditLogger::new(
        logs,
        archiver,
        dispatcher.clone(),
        settings.clone(),
    ));
    let executor = Arc::new(BackupExecutor::new(
        settings.clone(),
        snapshot,
        catalog,
        blobs,
        audit.clone(),
        dispatcher.clone(),
    ));
    let scheduler = Arc::new(BackupScheduler::new(settings, executor.clone(), audit.clone()));

    AppServices {
        audit,
        dispatcher,
        executor,
        scheduler,
        schedule_handle: Mutex::new(None),
    }
}
