//! sqscale-aws — AWS-backed collaborators.
//!
//! - [`CloudWatchMetrics`] serves the `AWS/SQS` queue metrics
//!   (`GetMetricStatistics`, newest datapoint in the window).
//! - [`SqsQueueDepth`] reads `ApproximateNumberOfMessages` via
//!   `GetQueueAttributes`.
//!
//! Both share one SDK config built by [`load_sdk_config`].

pub mod cloudwatch;
pub mod sqs;

pub use cloudwatch::CloudWatchMetrics;
pub use sqs::SqsQueueDepth;

use aws_config::{BehaviorVersion, Region, SdkConfig};

/// Resolve credentials and region from the environment, overriding the
/// region when one is given.
pub async fn load_sdk_config(region: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_owned()));
    }
    loader.load().await
}
