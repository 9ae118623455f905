//! sqscale-core — shared types for the queue-driven replica autoscaler.
//!
//! Holds the configuration surface (`sqscale.toml`), the per-tick
//! [`MetricSnapshot`], the error taxonomy and the traits through which
//! the autoscaler talks to its external collaborators (metric source,
//! queue depth source, replica controller).

pub mod config;
pub mod duration;
pub mod error;
pub mod source;
pub mod types;

pub use config::{
    MagnitudePolicyConfig, QueueConfig, ScalingConfig, SqscaleConfig, StatusConfig,
    WorkloadConfig,
};
pub use error::{ConfigError, ConfigResult, SourceError, SourceResult};
pub use source::{
    BoxFuture, MetricQuery, MetricSource, QueueDepthSource, ReplicaController, Statistic,
};
pub use types::{MetricSnapshot, ScaleDirection, Signal};
