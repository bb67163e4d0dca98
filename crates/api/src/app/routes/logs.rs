//! Audit log endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{ConnectInfo, Extension};
use axum::response::IntoResponse;
use serde_json::json;

use cliphub_core::UserId;
use cliphub_ops::audit::LogDraft;

use crate::app::dto::RecordLogRequest;
use crate::app::errors;
use crate::app::services::AppServices;

pub async fn record_log(
    Extension(services): Extension<Arc<AppServices>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    Json(body): Json<RecordLogRequest>,
) -> axum::response::Response {
    let mut draft = LogDraft::new(body.event_type, body.description);
    if let Some(user_id) = body.user_id {
        draft = draft.with_user(UserId::from_uuid(user_id));
    }
    // Peer address is captured server-side, never taken from the body.
    if let Some(ConnectInfo(addr)) = peer {
        draft = draft.with_source_address(addr.ip().to_string());
    }

    match services.audit.record(draft).await {
        Ok(entry) => Json(json!({
            "message": "event logged",
            "id": entry.id,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to record log entry");
            errors::internal_error()
        }
    }
}
