//! Command-line surface and config resolution.
//!
//! Resolution order: built-in defaults, then the TOML file (if given),
//! then flag overrides. The result is validated before it is returned.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};

use sqscale_core::duration::parse_duration;
use sqscale_core::{MagnitudePolicyConfig, SqscaleConfig};

#[derive(Parser, Debug)]
#[command(
    name = "sqscaled",
    about = "Scale a Kubernetes Deployment on SQS queue depth",
    version
)]
pub struct Cli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the autoscaler until interrupted.
    Run(ConfigArgs),
    /// Validate the resolved configuration and print it as TOML.
    CheckConfig(ConfigArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Args, Debug, Default, Clone)]
pub struct ConfigArgs {
    /// Path to sqscale.toml.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,
}

/// Flags that override individual config values.
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Interval between queue polls (e.g. "5s").
    #[arg(long, value_parser = duration_arg)]
    pub poll_period: Option<Duration>,

    /// Minimum time between two scale-ups.
    #[arg(long, value_parser = duration_arg)]
    pub scale_up_cool_down: Option<Duration>,

    /// Minimum time between two scale-downs.
    #[arg(long, value_parser = duration_arg)]
    pub scale_down_cool_down: Option<Duration>,

    /// Oldest-message age in seconds that counts as healthy.
    #[arg(long)]
    pub acceptable_age: Option<f64>,

    #[arg(long)]
    pub max_pods: Option<u32>,

    #[arg(long)]
    pub min_pods: Option<u32>,

    /// Let --min-pods go to zero.
    #[arg(long)]
    pub allow_zero_replicas: bool,

    /// Empty receives per minute required before scaling down.
    #[arg(long)]
    pub scale_down_empty: Option<f64>,

    #[arg(long)]
    pub aws_region: Option<String>,

    #[arg(long)]
    pub sqs_queue_url: Option<String>,

    #[arg(long)]
    pub kubernetes_deployment: Option<String>,

    #[arg(long)]
    pub kubernetes_namespace: Option<String>,

    /// Visible messages at or above which to scale up.
    #[arg(long)]
    pub scale_up_messages: Option<u64>,

    /// Visible messages at or below which to scale down.
    #[arg(long)]
    pub scale_down_messages: Option<u64>,

    /// Switch to exponential steps capped at this many replicas.
    #[arg(long)]
    pub max_adjustment_per_tick: Option<u32>,
}

impl Overrides {
    pub fn apply(&self, config: &mut SqscaleConfig) {
        let scaling = &mut config.scaling;
        if let Some(v) = self.poll_period {
            scaling.poll_interval = v;
        }
        if let Some(v) = self.scale_up_cool_down {
            scaling.scale_up_cooldown = v;
        }
        if let Some(v) = self.scale_down_cool_down {
            scaling.scale_down_cooldown = v;
        }
        if let Some(v) = self.acceptable_age {
            scaling.acceptable_age_secs = v;
        }
        if let Some(v) = self.max_pods {
            scaling.max_replicas = v;
        }
        if let Some(v) = self.min_pods {
            scaling.min_replicas = v;
        }
        if self.allow_zero_replicas {
            scaling.allow_zero_replicas = true;
        }
        if let Some(v) = self.scale_down_empty {
            scaling.scale_down_empty_receives = Some(v);
        }
        if let Some(v) = self.scale_up_messages {
            scaling.scale_up_threshold = v;
        }
        if let Some(v) = self.scale_down_messages {
            scaling.scale_down_threshold = v;
        }
        if let Some(v) = self.max_adjustment_per_tick {
            scaling.policy = MagnitudePolicyConfig::ExponentialStep {
                max_adjustment_per_tick: v,
            };
        }

        if let Some(v) = &self.aws_region {
            config.queue.region = Some(v.clone());
        }
        if let Some(v) = &self.sqs_queue_url {
            config.queue.url = v.clone();
        }
        if let Some(v) = &self.kubernetes_deployment {
            config.workload.deployment = v.clone();
        }
        if let Some(v) = &self.kubernetes_namespace {
            config.workload.namespace = v.clone();
        }
    }
}

impl ConfigArgs {
    /// Load, override, validate.
    pub fn resolve(&self) -> anyhow::Result<SqscaleConfig> {
        let mut config = match &self.config {
            Some(path) => SqscaleConfig::from_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => SqscaleConfig::default(),
        };
        self.overrides.apply(&mut config);
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn duration_arg(s: &str) -> Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}
