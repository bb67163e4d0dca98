//! Recurring backup trigger with an at-most-one-concurrent-cycle guarantee.

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use cron::Schedule;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use cliphub_core::DomainError;

use crate::audit::{AuditLogger, LogDraft};
use crate::backup::BackupExecutor;
use crate::settings::SettingsProvider;
use crate::store::StoreError;

/// Failure to register the recurring backup trigger.
///
/// The scheduler fails fast: a malformed cadence or unreadable settings
/// surface here, at `start`, rather than letting the pipeline run silently
/// on a default.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid backup cadence {expression:?}: {message}")]
    InvalidCadence { expression: String, message: String },

    #[error(transparent)]
    Configuration(#[from] DomainError),

    #[error("could not read backup settings: {0}")]
    Settings(#[from] StoreError),
}

/// Parse a cadence expression into a recurring cron schedule.
pub fn parse_cadence(expression: &str) -> Result<Schedule, ScheduleError> {
    Schedule::from_str(expression).map_err(|e| ScheduleError::InvalidCadence {
        expression: expression.to_string(),
        message: e.to_string(),
    })
}

/// Handle to a registered backup schedule.
///
/// `stop` prevents future ticks; an in-flight cycle runs to completion or
/// failure on its own.
#[derive(Debug)]
pub struct SchedulerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Prevent any future tick from firing. Non-blocking.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }

    /// Stop and wait for the timer loop to wind down.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}

/// Owns the recurring timer that drives backup cycles.
pub struct BackupScheduler {
    settings: Arc<dyn SettingsProvider>,
    executor: Arc<BackupExecutor>,
    audit: Arc<AuditLogger>,
}

impl BackupScheduler {
    pub fn new(
        settings: Arc<dyn SettingsProvider>,
        executor: Arc<BackupExecutor>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            settings,
            executor,
            audit,
        }
    }

    /// Read the cadence from current settings, register the recurring
    /// trigger and return a stoppable handle.
    ///
    /// Executor failures inside a cycle never stop future ticks. If a tick
    /// fires while a previous cycle is still running, the tick is skipped
    /// and audit-logged as `backup_skipped_overlap`; the "cycle in progress"
    /// flag is the only shared mutable state and is cleared on every exit
    /// path of a cycle.
    pub async fn start(&self) -> Result<SchedulerHandle, ScheduleError> {
        let settings = self.settings.backup_settings().await?;
        settings.validate()?;
        let schedule = parse_cadence(&settings.cadence)?;

        info!(cadence = %settings.cadence, "backup schedule registered");

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let executor = self.executor.clone();
        let audit = self.audit.clone();
        let in_flight = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(async move {
            loop {
                let Some(next) = schedule.upcoming(Utc).next() else {
                    warn!("backup cadence has no upcoming occurrence, stopping");
                    break;
                };
                let delay = (next - Utc::now())
                    .to_std()
                    .unwrap_or(std::time::Duration::ZERO);

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = stop_rx.changed() => break,
                }

                if in_flight
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    let executor = executor.clone();
                    let flag = in_flight.clone();
                    tokio::spawn(async move {
                        executor.execute().await;
                        flag.store(false, Ordering::SeqCst);
                    });
                } else {
                    // Previous cycle still running; this tick is dropped, not queued.
                    if let Err(e) = audit
                        .record(LogDraft::new(
                            "backup_skipped_overlap",
                            "backup tick skipped: previous cycle still in progress",
                        ))
                        .await
                    {
                        error!(error = %e, "could not record skipped backup tick");
                    }
                }
            }
            info!("backup schedule stopped");
        });

        Ok(SchedulerHandle {
            stop: stop_tx,
            task,
        })
    }
}
