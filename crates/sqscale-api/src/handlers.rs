//! Status handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::StatusState;

/// Response wrapper for consistent API format.
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}

/// GET /api/v1/status
///
/// `data` is absent until the first tick has finished.
pub async fn status(State(state): State<StatusState>) -> impl IntoResponse {
    let report = state.reports.borrow().clone();
    Json(ApiResponse {
        success: true,
        data: report,
    })
}

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<StatusState>) -> impl IntoResponse {
    let body = sqscale_metrics::render_prometheus(&state.telemetry.snapshot(), &state.labels);
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
