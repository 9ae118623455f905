//! sqscale-api — status surface for the autoscaler daemon.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/healthz` | Liveness probe |
//! | GET | `/metrics` | Prometheus exposition |
//! | GET | `/api/v1/status` | Latest tick report |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use sqscale_autoscale::TickReport;
use sqscale_metrics::{MetricLabels, ScalerTelemetry};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

/// Shared state for the status handlers.
#[derive(Clone)]
pub struct StatusState {
    pub telemetry: Arc<ScalerTelemetry>,
    pub reports: watch::Receiver<Option<TickReport>>,
    pub labels: MetricLabels,
}

pub fn build_router(state: StatusState) -> Router {
    let api_routes = Router::new()
        .route("/status", get(handlers::status))
        .with_state(state.clone());

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::prometheus_metrics).with_state(state))
        .nest("/api/v1", api_routes)
}

/// Serve the status router on a bound listener until `shutdown` flips.
pub async fn serve(
    listener: TcpListener,
    state: StatusState,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "status server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await
}
