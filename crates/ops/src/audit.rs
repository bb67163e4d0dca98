//! Structured audit/event logging into the live log store.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use cliphub_core::{LogEntryId, UserId};

use crate::archiver::LogArchiver;
use crate::notify::NotificationDispatcher;
use crate::settings::SettingsProvider;
use crate::store::{LogStore, StoreError};
use crate::types::{LogEntry, OpsEvent, OpsEventKind};

/// Event types that are escalated to an admin notification in addition to
/// the log row.
const SECURITY_EVENT_TYPES: &[&str] = &["unauthorized_access", "security_breach"];

pub fn is_security_event(event_type: &str) -> bool {
    SECURITY_EVENT_TYPES.contains(&event_type)
}

/// Input to [`AuditLogger::record`]; the logger assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct LogDraft {
    pub event_type: String,
    pub description: String,
    pub user_id: Option<UserId>,
    pub source_address: Option<String>,
}

impl LogDraft {
    pub fn new(event_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            description: description.into(),
            user_id: None,
            source_address: None,
        }
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_source_address(mut self, addr: impl Into<String>) -> Self {
        self.source_address = Some(addr.into());
        self
    }
}

/// Records structured events and drives the two secondary flows: security
/// escalation to the dispatcher and opportunistic log archival.
pub struct AuditLogger {
    logs: Arc<dyn LogStore>,
    archiver: Arc<LogArchiver>,
    dispatcher: Arc<NotificationDispatcher>,
    settings: Arc<dyn SettingsProvider>,
}

impl AuditLogger {
    pub fn new(
        logs: Arc<dyn LogStore>,
        archiver: Arc<LogArchiver>,
        dispatcher: Arc<NotificationDispatcher>,
        settings: Arc<dyn SettingsProvider>,
    ) -> Self {
        Self {
            logs,
            archiver,
            dispatcher,
            settings,
        }
    }

    /// Insert one log entry.
    ///
    /// Security-classified events additionally trigger a synchronous
    /// admin-targeted dispatch before this returns; its failure is logged
    /// but never fails the record call. Afterwards one archival pass runs
    /// opportunistically with the currently configured retention; archiver
    /// failures are likewise swallowed. Only the primary insert propagates.
    pub async fn record(&self, draft: LogDraft) -> Result<LogEntry, StoreError> {
        let entry = LogEntry {
            id: LogEntryId::new(),
            event_type: draft.event_type,
            description: draft.description,
            user_id: draft.user_id,
            source_address: draft.source_address,
            created_at: Utc::now(),
        };

        self.logs.insert(entry.clone()).await?;

        if is_security_event(&entry.event_type) {
            let event = security_event(&entry);
            if let Err(e) = self.dispatcher.dispatch(&event).await {
                warn!(
                    event_type = %entry.event_type,
                    error = %e,
                    "security escalation dispatch failed"
                );
            }
        }

        match self.settings.backup_settings().await {
            Ok(settings) => {
                if let Err(e) = self.archiver.archive(settings.retention()).await {
                    warn!(error = %e, "opportunistic log archival failed");
                }
            }
            Err(e) => warn!(error = %e, "could not read retention settings, skipping archival"),
        }

        Ok(entry)
    }
}

/// Admin-targeted event describing a security-classified log entry.
fn security_event(entry: &LogEntry) -> OpsEvent {
    let mut event = OpsEvent::new(
        OpsEventKind::SecurityAlert,
        format!("security event recorded: {}", entry.event_type),
    )
    .with_detail(serde_json::json!({
        "event_type": entry.event_type,
        "description": entry.description,
        "user_id": entry.user_id,
        "source_address": entry.source_address,
        "occurred_at": entry.created_at,
    }));
    if let Some(user_id) = entry.user_id {
        event = event.with_user(user_id);
    }
    event
}
