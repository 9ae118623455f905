//! Router tests: the status surface as an HTTP client sees it.

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tokio::sync::watch;
use tower::ServiceExt;

use sqscale_api::{StatusState, build_router};
use sqscale_autoscale::{ScaleAction, ScaleDecision, TickReport, TickStatus};
use sqscale_core::MetricSnapshot;
use sqscale_metrics::{MetricLabels, ScalerTelemetry};

fn test_state() -> (StatusState, watch::Sender<Option<TickReport>>) {
    let (tx, rx) = watch::channel(None);
    let state = StatusState {
        telemetry: Arc::new(ScalerTelemetry::new()),
        reports: rx,
        labels: MetricLabels {
            queue: "jobs".to_string(),
            deployment: "batch/worker".to_string(),
        },
    };
    (state, tx)
}

fn scaled_report() -> TickReport {
    TickReport {
        epoch: 1_700_000_000,
        status: TickStatus::Scaled,
        snapshot: Some(MetricSnapshot {
            oldest_message_age_secs: 30.0,
            messages_deleted: 20.0,
            messages_sent: 40.0,
            empty_receives: 0.0,
            visible_messages: 150,
            current_replicas: 2,
        }),
        decision: Some(ScaleDecision {
            action: ScaleAction::ScaleUp { by: 2 },
            current_replicas: 2,
            target_replicas: 4,
            hold: None,
        }),
        applied_replicas: Some(4),
        smoothed_rate_per_replica: Some(10.0),
        error: None,
    }
}

async fn get(router: axum::Router, uri: &str) -> (StatusCode, String) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn healthz_returns_ok() {
    let (state, _tx) = test_state();
    let (status, body) = get(build_router(state), "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn status_has_no_data_before_first_tick() {
    let (state, _tx) = test_state();
    let (status, body) = get(build_router(state), "/api/v1/status").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["success"], true);
    assert!(json.get("data").is_none());
}

#[tokio::test]
async fn status_serves_latest_report() {
    let (state, tx) = test_state();
    let router = build_router(state);
    tx.send_replace(Some(scaled_report()));

    let (status, body) = get(router, "/api/v1/status").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["status"], "scaled");
    assert_eq!(json["data"]["applied_replicas"], 4);
    assert_eq!(json["data"]["decision"]["target_replicas"], 4);
    assert_eq!(json["data"]["snapshot"]["visible_messages"], 150);
}

#[tokio::test]
async fn metrics_render_telemetry() {
    let (state, _tx) = test_state();
    state.telemetry.record_tick();
    state.telemetry.record_scaled(sqscale_core::ScaleDirection::Up, 4);

    let (status, body) = get(build_router(state), "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("sqscale_ticks_total{queue=\"jobs\",deployment=\"batch/worker\"} 1"));
    assert!(body.contains("sqscale_scale_ups_total{queue=\"jobs\",deployment=\"batch/worker\"} 1"));
    assert!(body.contains("sqscale_target_replicas{queue=\"jobs\",deployment=\"batch/worker\"} 4"));
}

#[tokio::test]
async fn unknown_route_is_404() {
    let (state, _tx) = test_state();
    let (status, _) = get(build_router(state), "/api/v1/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
