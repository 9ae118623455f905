//! Metric snapshot collector — gathers every signal for one tick.
//!
//! Signals are fetched one after another. The first failure aborts the
//! collection; a partial snapshot is never returned.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use sqscale_core::{
    MetricQuery, MetricSnapshot, MetricSource, QueueConfig, QueueDepthSource, ReplicaController,
    Signal, SourceError, SourceResult, Statistic, WorkloadConfig,
};

use crate::error::{TickError, TickResult};

/// Lookback window for queue metrics.
pub const METRIC_WINDOW: Duration = Duration::from_secs(60);

/// The external systems the autoscaler reads from and writes to.
#[derive(Clone)]
pub struct Collaborators {
    pub metrics: Arc<dyn MetricSource>,
    pub depth: Arc<dyn QueueDepthSource>,
    pub replicas: Arc<dyn ReplicaController>,
}

pub struct SnapshotCollector {
    collaborators: Collaborators,
    /// Metric dimension name.
    queue_name: String,
    /// Identifier handed to the queue depth source.
    queue_url: String,
    workload: WorkloadConfig,
    call_timeout: Duration,
}

impl SnapshotCollector {
    pub fn new(
        collaborators: Collaborators,
        queue: &QueueConfig,
        workload: WorkloadConfig,
        call_timeout: Duration,
    ) -> Self {
        Self {
            collaborators,
            queue_name: queue.queue_name().to_string(),
            queue_url: queue.url.clone(),
            workload,
            call_timeout,
        }
    }

    /// Collect a complete snapshot or fail on the first missing signal.
    pub async fn collect(&self) -> TickResult<MetricSnapshot> {
        let mut values = [0.0; Signal::METRICS.len()];
        let queries = Signal::METRICS
            .into_iter()
            .filter_map(|signal| signal.metric().map(|(metric, stat)| (signal, metric, stat)));
        for (slot, (signal, metric, statistic)) in values.iter_mut().zip(queries) {
            *slot = self.metric(signal, metric, statistic).await?;
        }
        let [
            oldest_message_age_secs,
            messages_deleted,
            messages_sent,
            empty_receives,
        ] = values;

        let visible_messages = bounded(
            "queue depth",
            self.call_timeout,
            self.collaborators
                .depth
                .approximate_visible_messages(&self.queue_url),
        )
        .await
        .map_err(|source| TickError::Collection {
            signal: Signal::VisibleMessages,
            source,
        })?;

        let current_replicas = bounded(
            "replica read",
            self.call_timeout,
            self.collaborators.replicas.current_replicas(&self.workload),
        )
        .await
        .map_err(TickError::ReplicaRead)?;

        let snapshot = MetricSnapshot {
            oldest_message_age_secs,
            messages_deleted,
            messages_sent,
            empty_receives,
            visible_messages,
            current_replicas,
        };
        debug!(
            queue = %self.queue_name,
            visible = snapshot.visible_messages,
            age_secs = snapshot.oldest_message_age_secs,
            sent = snapshot.messages_sent,
            deleted = snapshot.messages_deleted,
            empty = snapshot.empty_receives,
            replicas = snapshot.current_replicas,
            "snapshot collected"
        );
        Ok(snapshot)
    }

    async fn metric(
        &self,
        signal: Signal,
        metric: &'static str,
        statistic: Statistic,
    ) -> TickResult<f64> {
        let query = MetricQuery {
            metric,
            statistic,
            queue: &self.queue_name,
            window: METRIC_WINDOW,
        };
        bounded(
            "metric fetch",
            self.call_timeout,
            self.collaborators.metrics.fetch(query),
        )
        .await
        .map_err(|source| TickError::Collection { signal, source })
    }
}

/// Run a collaborator call with an upper time bound.
pub(crate) async fn bounded<T>(
    operation: &'static str,
    after: Duration,
    call: impl Future<Output = SourceResult<T>>,
) -> SourceResult<T> {
    match tokio::time::timeout(after, call).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout { operation, after }),
    }
}
