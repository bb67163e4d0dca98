//! `cliphub-ops` — the operational pipeline.
//!
//! Three collaborating subsystems around one shared need: perform multi-step
//! operations against unreliable external systems, tolerate partial failure,
//! and keep operators informed.
//!
//! - backup: recurring scheduler + cycle executor ([`scheduler`], [`backup`])
//! - log lifecycle: audit logger + live-to-archive mover ([`audit`], [`archiver`])
//! - notifications: content composer + fan-out dispatcher ([`notify`])
//!
//! External collaborators (relational store, blob storage, generative text)
//! sit behind the traits in [`store`], [`settings`] and [`notify`]; adapters
//! live in `cliphub-infra`.

pub mod archiver;
pub mod audit;
pub mod backup;
pub mod notify;
pub mod scheduler;
pub mod settings;
pub mod store;
pub mod types;

pub use archiver::{ArchiveReport, LogArchiver};
pub use audit::{AuditLogger, LogDraft};
pub use backup::BackupExecutor;
pub use notify::{
    FALLBACK_MESSAGE, DispatchOutcome, NotificationComposer, NotificationDispatcher, TextGenError,
    TextGenerator,
};
pub use scheduler::{BackupScheduler, ScheduleError, SchedulerHandle};
pub use settings::{BackupSettings, SettingsProvider, StorageSettings};
pub use store::{
    BlobStore, LogArchive, LogStore, MediaCatalog, NotificationStore, SnapshotTrigger, StoreError,
    UserDirectory,
};
pub use types::{
    Audience, BackupItemError, BackupOutcome, BackupRecord, LogEntry, MediaAsset, Notification,
    OpsEvent, OpsEventKind, Role,
};
