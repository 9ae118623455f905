//! sqscaled — the sqscale daemon.
//!
//! Polls an SQS queue and resizes a Kubernetes Deployment to keep the
//! queue drained. Assembles the collaborators (CloudWatch, SQS,
//! Kubernetes), the autoscaler poll loop and the status server.
//!
//! # Usage
//!
//! ```text
//! sqscaled run --config /etc/sqscale/sqscale.toml
//! sqscaled run --sqs-queue-url https://sqs.../jobs --kubernetes-deployment worker
//! sqscaled check-config --config sqscale.toml
//! ```

mod cli;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sqscale_api::StatusState;
use sqscale_autoscale::{Autoscaler, Collaborators};
use sqscale_aws::{CloudWatchMetrics, SqsQueueDepth};
use sqscale_core::SqscaleConfig;
use sqscale_kube::KubeReplicaController;
use sqscale_metrics::{MetricLabels, ScalerTelemetry};

use crate::cli::{Cli, Command, LogFormat};

const DEFAULT_LOG_FILTER: &str = "info,sqscale=debug,sqscaled=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Run(args) => run(args.resolve()?).await,
        Command::CheckConfig(args) => {
            let config = args.resolve()?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(config: SqscaleConfig) -> anyhow::Result<()> {
    info!(
        queue = config.queue.queue_name(),
        workload = %config.workload,
        "sqscaled starting"
    );

    // ── Collaborators ──────────────────────────────────────────

    let sdk = sqscale_aws::load_sdk_config(config.queue.region.as_deref()).await;
    let replicas =
        KubeReplicaController::connect(config.scaling.min_replicas, config.scaling.max_replicas)
            .await
            .context("failed to create kubernetes client")?;
    info!("kubernetes client ready");

    let collaborators = Collaborators {
        metrics: Arc::new(CloudWatchMetrics::new(&sdk)),
        depth: Arc::new(SqsQueueDepth::new(&sdk)),
        replicas: Arc::new(replicas),
    };

    let telemetry = Arc::new(ScalerTelemetry::new());
    let mut autoscaler = Autoscaler::new(&config, collaborators, Instant::now())
        .with_telemetry(Arc::clone(&telemetry));

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Status server ──────────────────────────────────────────

    let server_handle = if config.status.enabled {
        let listener = tokio::net::TcpListener::bind(config.status.listen)
            .await
            .with_context(|| format!("failed to bind status server on {}", config.status.listen))?;
        let state = StatusState {
            telemetry,
            reports: autoscaler.subscribe(),
            labels: MetricLabels {
                queue: config.queue.queue_name().to_string(),
                deployment: config.workload.to_string(),
            },
        };
        Some(tokio::spawn(sqscale_api::serve(
            listener,
            state,
            shutdown_rx.clone(),
        )))
    } else {
        info!("status server disabled");
        None
    };

    // ── Poll loop ──────────────────────────────────────────────

    let scaler_handle = tokio::spawn(async move {
        autoscaler.run(shutdown_rx).await;
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to install ctrl-c handler")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    scaler_handle.await.context("autoscaler task panicked")?;
    if let Some(handle) = server_handle {
        handle
            .await
            .context("status server task panicked")?
            .context("status server failed")?;
    }

    info!("sqscaled stopped");
    Ok(())
}
