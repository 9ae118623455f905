//! Autoscaler — the poll driver.
//!
//! Once per poll interval: collect a snapshot, run the decision engine,
//! hand any action to the executor. Ticks run strictly one after another;
//! a slow tick delays the next one instead of overlapping it.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use sqscale_core::{MetricSnapshot, ScalingConfig, SqscaleConfig, WorkloadConfig};
use sqscale_metrics::ScalerTelemetry;

use crate::collector::{Collaborators, SnapshotCollector};
use crate::decision::{HoldReason, ScaleDecision, decide};
use crate::error::{TickError, TickResult};
use crate::executor::ActionExecutor;
use crate::state::ScalerState;

/// Result of a tick that got as far as a decision.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub snapshot: MetricSnapshot,
    pub decision: ScaleDecision,
    /// Replica count the controller reported setting, if the decision
    /// was applied.
    pub applied_replicas: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickStatus {
    Held,
    Scaled,
    Aborted,
    WriteFailed,
}

/// Published after every tick for the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    /// Unix seconds when the tick finished.
    pub epoch: u64,
    pub status: TickStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<MetricSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<ScaleDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_replicas: Option<u32>,
    pub smoothed_rate_per_replica: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct Autoscaler {
    config: ScalingConfig,
    queue: String,
    workload: WorkloadConfig,
    collector: SnapshotCollector,
    executor: ActionExecutor,
    state: ScalerState,
    telemetry: Arc<ScalerTelemetry>,
    reports: watch::Sender<Option<TickReport>>,
}

impl Autoscaler {
    /// Create an autoscaler whose cooldown clocks start at `started_at`.
    ///
    /// `config` is assumed validated.
    pub fn new(config: &SqscaleConfig, collaborators: Collaborators, started_at: Instant) -> Self {
        let scaling = config.scaling.clone();
        let queue = config.queue.queue_name().to_string();
        let workload = config.workload.clone();

        let collector = SnapshotCollector::new(
            collaborators.clone(),
            &config.queue,
            workload.clone(),
            scaling.call_timeout,
        );
        let executor =
            ActionExecutor::new(collaborators.replicas, workload.clone(), scaling.call_timeout);
        let (reports, _) = watch::channel(None);

        Self {
            config: scaling,
            queue,
            workload,
            collector,
            executor,
            state: ScalerState::new(started_at),
            telemetry: Arc::new(ScalerTelemetry::new()),
            reports,
        }
    }

    /// Share a telemetry sink with the status server.
    pub fn with_telemetry(mut self, telemetry: Arc<ScalerTelemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Replace the initial scaler state.
    pub fn with_state(mut self, state: ScalerState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &ScalerState {
        &self.state
    }

    pub fn telemetry(&self) -> Arc<ScalerTelemetry> {
        Arc::clone(&self.telemetry)
    }

    /// Receive a [`TickReport`] after every tick. `None` until the first.
    pub fn subscribe(&self) -> watch::Receiver<Option<TickReport>> {
        self.reports.subscribe()
    }

    /// Run one full tick: collect, decide, execute.
    ///
    /// A collection failure leaves the scaler state untouched. A write
    /// failure keeps the rate update but leaves the cooldown clocks alone.
    pub async fn tick(&mut self, now: Instant) -> TickResult<TickOutcome> {
        self.telemetry.record_tick();

        let snapshot = match self.collector.collect().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.telemetry.record_abort();
                self.publish(TickStatus::Aborted, None, None, None, Some(&e));
                return Err(e);
            }
        };
        self.telemetry.observe_snapshot(&snapshot);

        let (decision, next) = decide(&snapshot, &self.state, &self.config, now);
        self.state = next;
        self.telemetry
            .observe_rate(self.state.smoothed_rate_per_replica());

        if let Some(hold) = decision.hold {
            self.note_hold(&hold, &decision);
        }

        match self.executor.execute(&decision, &mut self.state, now).await {
            Ok(applied) => {
                let status = match (decision.action.direction(), applied) {
                    (Some(direction), Some(count)) => {
                        self.telemetry.record_scaled(direction, count);
                        TickStatus::Scaled
                    }
                    _ => {
                        self.telemetry.observe_target(decision.target_replicas);
                        TickStatus::Held
                    }
                };
                self.publish(status, Some(snapshot.clone()), Some(decision), applied, None);
                Ok(TickOutcome {
                    snapshot,
                    decision,
                    applied_replicas: applied,
                })
            }
            Err(e) => {
                self.telemetry.record_write_failure();
                self.publish(
                    TickStatus::WriteFailed,
                    Some(snapshot),
                    Some(decision),
                    None,
                    Some(&e),
                );
                Err(e)
            }
        }
    }

    /// Run the poll loop until the shutdown signal fires.
    ///
    /// An in-flight tick always completes before shutdown is observed.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            queue = %self.queue,
            workload = %self.workload,
            interval_ms = self.config.poll_interval.as_millis() as u64,
            min = self.config.min_replicas,
            max = self.config.max_replicas,
            "autoscaler started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {
                    if let Err(e) = self.tick(Instant::now()).await {
                        report_tick_error(&e);
                    }
                }
                _ = shutdown.changed() => {
                    info!("autoscaler shutting down");
                    break;
                }
            }
        }
    }

    fn note_hold(&self, hold: &HoldReason, decision: &ScaleDecision) {
        match hold {
            HoldReason::CooldownActive {
                direction,
                remaining,
            } => {
                self.telemetry.record_cooldown_hold();
                debug!(
                    %direction,
                    remaining_ms = remaining.as_millis() as u64,
                    replicas = decision.current_replicas,
                    "waiting for cool down, skipping scale {direction}"
                );
            }
            HoldReason::AtBound { direction } => {
                debug!(
                    %direction,
                    replicas = decision.current_replicas,
                    min = self.config.min_replicas,
                    max = self.config.max_replicas,
                    "replica bound reached"
                );
            }
            HoldReason::WithinThresholds | HoldReason::QueueNotIdle => {
                debug!(
                    reason = ?hold,
                    replicas = decision.current_replicas,
                    "no scaling needed"
                );
            }
        }
    }

    fn publish(
        &self,
        status: TickStatus,
        snapshot: Option<MetricSnapshot>,
        decision: Option<ScaleDecision>,
        applied_replicas: Option<u32>,
        error: Option<&TickError>,
    ) {
        let report = TickReport {
            epoch: epoch_secs(),
            status,
            snapshot,
            decision,
            applied_replicas,
            smoothed_rate_per_replica: self.state.smoothed_rate_per_replica(),
            error: error.map(ToString::to_string),
        };
        self.reports.send_replace(Some(report));
    }
}

fn report_tick_error(e: &TickError) {
    match e {
        TickError::Collection { signal, source } => {
            error!(%signal, error = %source, "failed to collect metrics, skipping tick");
        }
        TickError::ReplicaRead(source) => {
            error!(error = %source, "failed to get replica count, skipping tick");
        }
        TickError::ReplicaWrite { target, source } => {
            warn!(target_replicas = *target, error = %source, "failed scaling, will retry next tick");
        }
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
