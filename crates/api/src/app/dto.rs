//! Request DTOs for the trigger endpoints.

use serde::Deserialize;
use uuid::Uuid;

use cliphub_ops::types::OpsEventKind;

#[derive(Debug, Deserialize)]
pub struct RecordLogRequest {
    pub event_type: String,
    pub description: String,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    pub kind: OpsEventKind,
    pub summary: String,
    pub user_id: Option<Uuid>,
    pub detail: Option<serde_json::Value>,
}
