use std::sync::Arc;

use axum::{Extension, Router, routing::get, routing::post};

use crate::app::services::AppServices;

pub mod logs;
pub mod notifications;
pub mod system;

pub fn router(services: Arc<AppServices>) -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/system/backup/run", post(system::run_backup))
        .route("/system/backup/schedule", post(system::schedule_backup))
        .route("/system/logs", post(logs::record_log))
        .route("/notifications/dispatch", post(notifications::dispatch))
        .layer(Extension(services))
}
