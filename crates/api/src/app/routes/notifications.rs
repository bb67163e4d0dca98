//! Notification dispatch endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::Extension;
use axum::response::IntoResponse;
use serde_json::json;

use cliphub_core::UserId;
use cliphub_ops::types::OpsEvent;

use crate::app::dto::DispatchRequest;
use crate::app::errors;
use crate::app::services::AppServices;

pub async fn dispatch(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<DispatchRequest>,
) -> axum::response::Response {
    let mut event = OpsEvent::new(body.kind, body.summary);
    if let Some(detail) = body.detail {
        event = event.with_detail(detail);
    }
    if let Some(user_id) = body.user_id {
        event = event.with_user(UserId::from_uuid(user_id));
    }

    match services.dispatcher.dispatch(&event).await {
        Ok(outcome) => Json(json!({
            "message": "notification dispatched",
            "audience": outcome.audience_size,
            "delivered": outcome.delivered,
            "skipped": outcome.skipped,
            "failed": outcome.failed,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to dispatch notification");
            errors::internal_error()
        }
    }
}
