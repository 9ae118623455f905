//! sqscale-metrics — observability for the autoscaler itself.
//!
//! The poll driver updates a shared [`ScalerTelemetry`] after every tick;
//! the status server reads a [`TelemetrySnapshot`] from it and renders the
//! Prometheus text format.
//!
//! # Architecture
//!
//! ```text
//! ScalerTelemetry
//!   ├── record_*() / observe_*() ← called by the poll driver
//!   └── snapshot() → TelemetrySnapshot
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for /metrics endpoint
//! ```

pub mod prometheus;
pub mod telemetry;

pub use prometheus::{render_prometheus, MetricLabels};
pub use telemetry::{ScalerTelemetry, TelemetrySnapshot};
