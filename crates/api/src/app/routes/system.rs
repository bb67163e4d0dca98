//! Backup trigger endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use crate::app::errors;
use crate::app::services::AppServices;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Run one backup cycle now, outside the schedule.
pub async fn run_backup(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let record = services.executor.execute().await;
    Json(json!({
        "message": "backup cycle finished",
        "outcome": record.outcome,
        "assets_attempted": record.assets_attempted,
        "items_copied": record.items_copied,
        "failed": record.errors.len(),
    }))
    .into_response()
}

/// Register (or refresh) the recurring backup schedule from current settings.
pub async fn schedule_backup(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    // Stop the previous schedule first so two timers never run side by side.
    let previous = services.schedule_handle.lock().unwrap().take();
    if let Some(handle) = previous {
        handle.stop();
    }

    match services.scheduler.start().await {
        Ok(handle) => {
            *services.schedule_handle.lock().unwrap() = Some(handle);
            Json(json!({ "message": "backup schedule registered" })).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to register backup schedule");
            errors::internal_error()
        }
    }
}
