//! Router-level tests over the in-memory wiring.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;

async fn post_json(app: axum::Router, uri: &str, body: serde_json::Value) -> StatusCode {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn health_is_ok() {
    let app = cliphub_api::app::build_app().await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn record_log_acks() {
    let app = cliphub_api::app::build_app().await;
    let status = post_json(
        app,
        "/system/logs",
        serde_json::json!({
            "event_type": "login",
            "description": "user signed in",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn record_log_rejects_malformed_body() {
    let app = cliphub_api::app::build_app().await;
    let status = post_json(app, "/system/logs", serde_json::json!({ "event_type": 7 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn dispatch_acks_with_empty_audience() {
    let app = cliphub_api::app::build_app().await;
    let status = post_json(
        app,
        "/notifications/dispatch",
        serde_json::json!({
            "kind": "content_update",
            "summary": "a new video was published",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn run_backup_acks() {
    let app = cliphub_api::app::build_app().await;
    let status = post_json(app, "/system/backup/run", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn schedule_registers_and_refreshes() {
    let app = cliphub_api::app::build_app().await;

    let first = post_json(app.clone(), "/system/backup/schedule", serde_json::json!({})).await;
    assert_eq!(first, StatusCode::OK);

    // Refreshing replaces the previous schedule rather than stacking timers.
    let second = post_json(app, "/system/backup/schedule", serde_json::json!({})).await;
    assert_eq!(second, StatusCode::OK);
}
