//! Collaborator traits consumed by the autoscaler.
//!
//! Implementations live in `sqscale-aws` (metrics, queue depth) and
//! `sqscale-kube` (replicas). Tests substitute in-memory mocks.
//!
//! The traits return boxed futures so they stay object-safe and can be
//! held as `Arc<dyn ...>` by the poll driver.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::WorkloadConfig;
use crate::error::SourceResult;

/// Boxed future alias for collaborator calls.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Aggregation applied to datapoints within the lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statistic {
    Sum,
    Maximum,
    Minimum,
    Average,
    SampleCount,
}

/// A single metric lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricQuery<'a> {
    pub metric: &'a str,
    pub statistic: Statistic,
    pub queue: &'a str,
    /// Trailing window the datapoint must fall within.
    pub window: Duration,
}

/// Returns the latest aggregated value of a queue metric.
pub trait MetricSource: Send + Sync {
    /// Fetch the most recent datapoint within `query.window`.
    ///
    /// Returns [`SourceError::NoDatapoints`](crate::SourceError::NoDatapoints)
    /// when the window is empty.
    fn fetch<'a>(&'a self, query: MetricQuery<'a>) -> BoxFuture<'a, SourceResult<f64>>;
}

/// Reports how many messages are currently visible in a queue.
pub trait QueueDepthSource: Send + Sync {
    fn approximate_visible_messages<'a>(&'a self, queue: &'a str)
    -> BoxFuture<'a, SourceResult<u64>>;
}

/// Reads and writes the replica count of a workload.
pub trait ReplicaController: Send + Sync {
    /// Currently available replicas.
    fn current_replicas<'a>(&'a self, workload: &'a WorkloadConfig)
    -> BoxFuture<'a, SourceResult<u32>>;

    /// Apply a new replica target. Returns the count actually set.
    fn set_replicas<'a>(
        &'a self,
        workload: &'a WorkloadConfig,
        target: u32,
    ) -> BoxFuture<'a, SourceResult<u32>>;
}
