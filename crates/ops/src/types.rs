//! Core data model for the operational pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cliphub_core::{LogEntryId, NotificationId, UserId, VideoId};

/// Role of a user account, as seen by the notification audience resolver.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Member,
}

/// One immutable row in the live log store.
///
/// Created by the audit logger, never mutated afterwards; after the retention
/// period elapses it is copied to the archive store and deleted from the live
/// store (in that order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: LogEntryId,
    pub event_type: String,
    pub description: String,
    pub user_id: Option<UserId>,
    pub source_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One persisted notification row.
///
/// Created exactly once per (event, recipient) pair; only the external
/// read-state toggle mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: UserId, message: impl Into<String>) -> Self {
        Self {
            id: NotificationId::new(),
            user_id,
            message: message.into(),
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

/// A media asset as enumerated by the catalog: the primary file and its
/// thumbnail, both copied during a backup cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: VideoId,
    pub file_path: String,
    pub thumbnail_path: String,
}

/// Outcome classification of one backup cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupOutcome {
    /// Every asset copied.
    Success,
    /// Some assets failed; already-copied assets are kept (no rollback).
    PartialFailure,
    /// The snapshot phase failed; no media loop was attempted.
    Failure,
}

/// One asset-level (or phase-level) failure inside a backup cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupItemError {
    /// Asset identifier, or a phase name (`database_snapshot`, ...) for
    /// cycle-level failures.
    pub item: String,
    pub error: String,
}

/// Summary of one complete backup cycle.
///
/// Emitted exactly once per cycle, after a complete pass, regardless of
/// outcome. Represented in persistence as an audit log row rather than a
/// dedicated table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: BackupOutcome,
    pub assets_attempted: usize,
    pub items_copied: usize,
    /// Ordered list of per-item failures, in enumeration order.
    pub errors: Vec<BackupItemError>,
    /// Whether the best-effort settings blob made it to durable storage.
    /// Does not affect outcome classification.
    pub settings_backed_up: bool,
}

impl BackupRecord {
    /// Record for a cycle that never reached the media loop.
    pub fn phase_failure(
        started_at: DateTime<Utc>,
        phase: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            started_at,
            finished_at: Utc::now(),
            outcome: BackupOutcome::Failure,
            assets_attempted: 0,
            items_copied: 0,
            errors: vec![BackupItemError {
                item: phase.into(),
                error: error.into(),
            }],
            settings_backed_up: false,
        }
    }

    /// Classify a completed media pass: `Success` iff nothing failed,
    /// `PartialFailure` otherwise (even when every asset failed).
    pub fn classify_pass(failed: usize) -> BackupOutcome {
        if failed == 0 {
            BackupOutcome::Success
        } else {
            BackupOutcome::PartialFailure
        }
    }
}

/// Which recipients an event targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Opted-in users with the admin role.
    Admins,
    /// Every opted-in user.
    AllOptedIn,
}

/// Classification of a structured pipeline event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpsEventKind {
    BackupCompleted,
    BackupFailed,
    SecurityAlert,
    ContentUpdate,
}

impl OpsEventKind {
    /// Security and backup-operational events target admins; general
    /// content events target all opted-in users.
    pub fn audience(&self) -> Audience {
        match self {
            OpsEventKind::BackupCompleted
            | OpsEventKind::BackupFailed
            | OpsEventKind::SecurityAlert => Audience::Admins,
            OpsEventKind::ContentUpdate => Audience::AllOptedIn,
        }
    }
}

/// A structured event handed to the notification dispatcher.
///
/// Components pass these as typed values (no HTTP hop between components of
/// the same process).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsEvent {
    pub kind: OpsEventKind,
    pub summary: String,
    #[serde(default)]
    pub detail: serde_json::Value,
    pub user_id: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

impl OpsEvent {
    pub fn new(kind: OpsEventKind, summary: impl Into<String>) -> Self {
        Self {
            kind,
            summary: summary.into(),
            detail: serde_json::Value::Null,
            user_id: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audience_classification() {
        assert_eq!(OpsEventKind::BackupCompleted.audience(), Audience::Admins);
        assert_eq!(OpsEventKind::BackupFailed.audience(), Audience::Admins);
        assert_eq!(OpsEventKind::SecurityAlert.audience(), Audience::Admins);
        assert_eq!(OpsEventKind::ContentUpdate.audience(), Audience::AllOptedIn);
    }

    #[test]
    fn pass_classification() {
        assert_eq!(BackupRecord::classify_pass(0), BackupOutcome::Success);
        assert_eq!(BackupRecord::classify_pass(3), BackupOutcome::PartialFailure);
    }

    #[test]
    fn phase_failure_record_shape() {
        let started = Utc::now();
        let record = BackupRecord::phase_failure(started, "database_snapshot", "store down");
        assert_eq!(record.outcome, BackupOutcome::Failure);
        assert_eq!(record.assets_attempted, 0);
        assert_eq!(record.items_copied, 0);
        assert_eq!(record.errors.len(), 1);
        assert_eq!(record.errors[0].item, "database_snapshot");
    }

    #[test]
    fn new_notification_is_unread() {
        let n = Notification::new(UserId::new(), "hello");
        assert!(!n.is_read);
    }
}
