//! Operational configuration, read from persisted configuration records.
//!
//! Pure reads, no mutation. Settings are immutable within one cycle and read
//! fresh at scheduler start (cadence) and per backup cycle (storage).

use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};

use cliphub_core::{DomainError, DomainResult};

use crate::store::StoreError;

/// Backup cadence and log retention window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSettings {
    /// Cron schedule expression driving the recurring backup trigger.
    pub cadence: String,
    /// Age after which live log rows are moved to the archive.
    pub retention_days: u32,
}

impl BackupSettings {
    /// Retention window as a duration.
    pub fn retention(&self) -> Duration {
        Duration::days(i64::from(self.retention_days))
    }

    /// Structural validation. Cadence parseability is checked separately at
    /// scheduler start, where a failure must abort the start call.
    pub fn validate(&self) -> DomainResult<()> {
        if self.cadence.trim().is_empty() {
            return Err(DomainError::validation("backup cadence must not be empty"));
        }
        if self.retention_days == 0 {
            return Err(DomainError::validation(
                "log retention must be at least one day",
            ));
        }
        Ok(())
    }
}

/// Durable storage target for backups.
///
/// The connection descriptor is a capability token: it is redacted from all
/// `Debug` output and must never be logged in plaintext.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct StorageSettings {
    pub connection: String,
    pub container: String,
}

impl std::fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageSettings")
            .field("connection", &"<redacted>")
            .field("container", &self.container)
            .finish()
    }
}

/// Read access to the persisted configuration records.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn backup_settings(&self) -> Result<BackupSettings, StoreError>;

    async fn storage_settings(&self) -> Result<StorageSettings, StoreError>;

    /// Full dump of the configuration rows, for the settings backup blob.
    async fn settings_snapshot(&self) -> Result<serde_json::Value, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_empty_cadence() {
        let settings = BackupSettings {
            cadence: "   ".to_string(),
            retention_days: 30,
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_retention() {
        let settings = BackupSettings {
            cadence: "0 0 3 * * *".to_string(),
            retention_days: 0,
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn debug_redacts_connection_descriptor() {
        let settings = StorageSettings {
            connection: "DefaultEndpointsProtocol=https;AccountKey=secret".to_string(),
            container: "backups".to_string(),
        };
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("backups"));
    }
}
