//! sqscale.toml configuration parser.
//!
//! ```toml
//! [scaling]
//! poll_interval = "5s"
//! scale_up_cooldown = "10s"
//! scale_down_cooldown = "30s"
//! scale_up_threshold = 100
//! scale_down_threshold = 10
//! acceptable_age = 150.0
//! min_replicas = 1
//! max_replicas = 5
//!
//! [scaling.policy]
//! kind = "exponential_step"
//! max_adjustment_per_tick = 4
//!
//! [queue]
//! url = "https://sqs.eu-west-1.amazonaws.com/123456789012/jobs"
//!
//! [workload]
//! deployment = "job-worker"
//! namespace = "batch"
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration::serde_str;
use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SqscaleConfig {
    #[serde(default)]
    pub scaling: ScalingConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub workload: WorkloadConfig,
    #[serde(default)]
    pub status: StatusConfig,
}

/// Tunables for the decision engine and poll loop. Immutable once the
/// daemon has started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingConfig {
    #[serde(with = "serde_str")]
    pub poll_interval: Duration,
    #[serde(with = "serde_str")]
    pub scale_up_cooldown: Duration,
    #[serde(with = "serde_str")]
    pub scale_down_cooldown: Duration,
    /// Upper bound on any single collaborator call.
    #[serde(with = "serde_str")]
    pub call_timeout: Duration,
    /// Queue depth at or above which the deployment scales up.
    pub scale_up_threshold: u64,
    /// Queue depth at or below which the deployment scales down.
    pub scale_down_threshold: u64,
    /// Oldest-message age (seconds) above which the incoming rate is
    /// inflated by the standing backlog.
    #[serde(rename = "acceptable_age")]
    pub acceptable_age_secs: f64,
    pub min_replicas: u32,
    pub max_replicas: u32,
    /// Permit `min_replicas = 0`.
    pub allow_zero_replicas: bool,
    /// When set, scale-down also requires at least this many empty
    /// receives in the sampling window.
    pub scale_down_empty_receives: Option<f64>,
    pub policy: MagnitudePolicyConfig,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            scale_up_cooldown: Duration::from_secs(10),
            scale_down_cooldown: Duration::from_secs(30),
            call_timeout: Duration::from_secs(10),
            scale_up_threshold: 100,
            scale_down_threshold: 10,
            acceptable_age_secs: 150.0,
            min_replicas: 1,
            max_replicas: 5,
            allow_zero_replicas: false,
            scale_down_empty_receives: None,
            policy: MagnitudePolicyConfig::default(),
        }
    }
}

/// How the size of a scaling step is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MagnitudePolicyConfig {
    /// Size steps from the per-replica processing rate.
    #[default]
    RateProportional,
    /// Double the step for every multiple of the threshold, capped.
    ExponentialStep { max_adjustment_per_tick: u32 },
}

impl ScalingConfig {
    /// Restrict a replica count to `[min_replicas, max_replicas]`.
    ///
    /// Accepts signed input so callers can clamp `current - by` without
    /// underflow.
    pub fn clamp(&self, replicas: i64) -> u32 {
        let clamped = replicas
            .max(i64::from(self.min_replicas))
            .min(i64::from(self.max_replicas));
        u32::try_from(clamped).unwrap_or(self.min_replicas)
    }

    pub fn max_adjustment_per_tick(&self) -> Option<u32> {
        match self.policy {
            MagnitudePolicyConfig::RateProportional => None,
            MagnitudePolicyConfig::ExponentialStep {
                max_adjustment_per_tick,
            } => Some(max_adjustment_per_tick),
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.poll_interval.is_zero() {
            return Err(invalid("poll_interval must be greater than zero"));
        }
        if self.call_timeout.is_zero() {
            return Err(invalid("call_timeout must be greater than zero"));
        }
        if !(self.acceptable_age_secs.is_finite() && self.acceptable_age_secs > 0.0) {
            return Err(invalid(format!(
                "acceptable_age must be a positive number of seconds, got {}",
                self.acceptable_age_secs
            )));
        }
        if self.min_replicas > self.max_replicas {
            return Err(invalid(format!(
                "min_replicas ({}) exceeds max_replicas ({})",
                self.min_replicas, self.max_replicas
            )));
        }
        if self.max_replicas == 0 {
            return Err(invalid("max_replicas must be at least 1"));
        }
        if self.min_replicas == 0 && !self.allow_zero_replicas {
            return Err(invalid(
                "min_replicas is 0; set allow_zero_replicas = true to permit scale-to-zero",
            ));
        }
        if self.scale_down_threshold >= self.scale_up_threshold {
            return Err(invalid(format!(
                "scale_down_threshold ({}) must be below scale_up_threshold ({})",
                self.scale_down_threshold, self.scale_up_threshold
            )));
        }
        if let Some(empty) = self.scale_down_empty_receives
            && !(empty.is_finite() && empty >= 0.0)
        {
            return Err(invalid("scale_down_empty_receives must be a non-negative number"));
        }
        if self.max_adjustment_per_tick() == Some(0) {
            return Err(invalid("max_adjustment_per_tick must be at least 1"));
        }
        Ok(())
    }
}

/// The queue being drained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    pub url: String,
    /// Metric dimension name. Derived from the URL when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl QueueConfig {
    /// Queue name: explicit `name`, else the last path segment of `url`.
    pub fn queue_name(&self) -> &str {
        if let Some(name) = self.name.as_deref() {
            return name;
        }
        self.url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }
}

/// The deployment whose replica count is managed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadConfig {
    #[serde(default)]
    pub deployment: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            deployment: String::new(),
            namespace: default_namespace(),
        }
    }
}

impl std::fmt::Display for WorkloadConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.deployment)
    }
}

fn default_namespace() -> String {
    "default".to_string()
}

/// Read-only HTTP status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub enabled: bool,
    pub listen: SocketAddr,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 9090)),
        }
    }
}

impl SqscaleConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every startup invariant. Must pass before the poll loop runs.
    pub fn validate(&self) -> ConfigResult<()> {
        self.scaling.validate()?;
        if self.queue.url.trim().is_empty() {
            return Err(invalid("queue.url is required"));
        }
        if self.queue.queue_name().is_empty() {
            return Err(invalid(format!(
                "cannot derive a queue name from {:?}",
                self.queue.url
            )));
        }
        if self.workload.deployment.trim().is_empty() {
            return Err(invalid("workload.deployment is required"));
        }
        if self.workload.namespace.trim().is_empty() {
            return Err(invalid("workload.namespace must not be empty"));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> SqscaleConfig {
        SqscaleConfig {
            queue: QueueConfig {
                url: "https://sqs.eu-west-1.amazonaws.com/123456789012/jobs".to_string(),
                ..Default::default()
            },
            workload: WorkloadConfig {
                deployment: "job-worker".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_full() {
        let toml_str = r#"
[scaling]
poll_interval = "2s"
scale_up_cooldown = "1m"
scale_down_cooldown = 90
scale_up_threshold = 500
scale_down_threshold = 20
acceptable_age = 60.0
min_replicas = 2
max_replicas = 12

[scaling.policy]
kind = "exponential_step"
max_adjustment_per_tick = 4

[queue]
url = "https://sqs.us-east-1.amazonaws.com/1/ingest"
region = "us-east-1"

[workload]
deployment = "ingest-worker"
namespace = "pipelines"

[status]
listen = "127.0.0.1:9191"
"#;
        let config = SqscaleConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.scaling.poll_interval, Duration::from_secs(2));
        assert_eq!(config.scaling.scale_up_cooldown, Duration::from_secs(60));
        assert_eq!(config.scaling.scale_down_cooldown, Duration::from_secs(90));
        assert_eq!(config.scaling.max_adjustment_per_tick(), Some(4));
        assert_eq!(config.scaling.min_replicas, 2);
        assert_eq!(config.queue.queue_name(), "ingest");
        assert_eq!(config.workload.to_string(), "pipelines/ingest-worker");
        assert_eq!(config.status.listen.port(), 9191);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_minimal_uses_defaults() {
        let toml_str = r#"
[queue]
url = "https://sqs.eu-west-1.amazonaws.com/1/jobs"

[workload]
deployment = "worker"
"#;
        let config = SqscaleConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.scaling, ScalingConfig::default());
        assert_eq!(config.scaling.policy, MagnitudePolicyConfig::RateProportional);
        assert_eq!(config.workload.namespace, "default");
        assert!(config.status.enabled);
        config.validate().unwrap();
    }

    #[test]
    fn test_render_roundtrips() {
        let mut config = valid_config();
        config.scaling.policy = MagnitudePolicyConfig::ExponentialStep {
            max_adjustment_per_tick: 3,
        };
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("poll_interval = \"5s\""));
        let back = SqscaleConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(back.scaling, config.scaling);
        assert_eq!(back.queue, config.queue);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sqscale.toml");
        std::fs::write(&path, valid_config().to_toml_string().unwrap()).unwrap();
        let config = SqscaleConfig::from_file(&path).unwrap();
        assert_eq!(config.workload.deployment, "job-worker");
    }

    #[test]
    fn test_from_missing_file_is_io_error() {
        let err = SqscaleConfig::from_file(Path::new("/nonexistent/sqscale.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_bad_duration_is_rejected() {
        let err = SqscaleConfig::from_toml_str("[scaling]\npoll_interval = \"soon\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validate_min_above_max() {
        let mut config = valid_config();
        config.scaling.min_replicas = 6;
        config.scaling.max_replicas = 3;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_zero_min_requires_opt_in() {
        let mut config = valid_config();
        config.scaling.min_replicas = 0;
        assert!(config.validate().is_err());
        config.scaling.allow_zero_replicas = true;
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_thresholds_ordered() {
        let mut config = valid_config();
        config.scaling.scale_down_threshold = 100;
        config.scaling.scale_up_threshold = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_max_adjustment() {
        let mut config = valid_config();
        config.scaling.policy = MagnitudePolicyConfig::ExponentialStep {
            max_adjustment_per_tick: 0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_identifiers() {
        let mut config = valid_config();
        config.workload.deployment.clear();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.queue.url.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_acceptable_age_positive() {
        let mut config = valid_config();
        config.scaling.acceptable_age_secs = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_clamp_is_idempotent() {
        let scaling = ScalingConfig {
            min_replicas: 2,
            max_replicas: 8,
            ..Default::default()
        };
        for raw in [-5_i64, 0, 1, 2, 5, 8, 9, 1_000] {
            let once = scaling.clamp(raw);
            assert!((2..=8).contains(&once));
            assert_eq!(scaling.clamp(i64::from(once)), once);
        }
    }

    #[test]
    fn test_queue_name_from_url() {
        let queue = QueueConfig {
            url: "https://sqs.eu-west-1.amazonaws.com/123/orders/".to_string(),
            ..Default::default()
        };
        assert_eq!(queue.queue_name(), "orders");

        let named = QueueConfig {
            name: Some("override".to_string()),
            ..queue
        };
        assert_eq!(named.queue_name(), "override");
    }
}
