//! CloudWatch-backed [`MetricSource`] for the `AWS/SQS` namespace.

use std::time::{SystemTime, UNIX_EPOCH};

use aws_config::SdkConfig;
use aws_sdk_cloudwatch::Client;
use aws_sdk_cloudwatch::error::DisplayErrorContext;
use aws_sdk_cloudwatch::primitives::DateTime;
use aws_sdk_cloudwatch::types::{Datapoint, Dimension, Statistic as CwStatistic};
use tracing::trace;

use sqscale_core::{BoxFuture, MetricQuery, MetricSource, SourceError, SourceResult, Statistic};

const SQS_NAMESPACE: &str = "AWS/SQS";
const QUEUE_DIMENSION: &str = "QueueName";

/// Reads SQS queue metrics through `GetMetricStatistics`.
///
/// One request per query, with the period equal to the lookback window so
/// CloudWatch aggregates the whole window into (usually) one datapoint.
#[derive(Debug, Clone)]
pub struct CloudWatchMetrics {
    client: Client,
}

impl CloudWatchMetrics {
    pub fn new(sdk: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl MetricSource for CloudWatchMetrics {
    fn fetch<'a>(&'a self, query: MetricQuery<'a>) -> BoxFuture<'a, SourceResult<f64>> {
        Box::pin(async move {
            let end = SystemTime::now();
            let start = end.checked_sub(query.window).unwrap_or(UNIX_EPOCH);

            let output = self
                .client
                .get_metric_statistics()
                .namespace(SQS_NAMESPACE)
                .metric_name(query.metric)
                .dimensions(
                    Dimension::builder()
                        .name(QUEUE_DIMENSION)
                        .value(query.queue)
                        .build(),
                )
                .start_time(DateTime::from(start))
                .end_time(DateTime::from(end))
                .period(period_secs(query))
                .statistics(sdk_statistic(query.statistic))
                .send()
                .await
                .map_err(|e| SourceError::request("cloudwatch", DisplayErrorContext(&e).to_string()))?;

            let datapoints = output.datapoints();
            trace!(
                metric = query.metric,
                queue = query.queue,
                datapoints = datapoints.len(),
                "cloudwatch response"
            );

            latest_value(datapoints, query.statistic).ok_or_else(|| SourceError::NoDatapoints {
                metric: query.metric.to_string(),
            })
        })
    }
}

fn period_secs(query: MetricQuery<'_>) -> i32 {
    i32::try_from(query.window.as_secs())
        .unwrap_or(i32::MAX)
        .max(1)
}

fn sdk_statistic(statistic: Statistic) -> CwStatistic {
    match statistic {
        Statistic::Sum => CwStatistic::Sum,
        Statistic::Maximum => CwStatistic::Maximum,
        Statistic::Minimum => CwStatistic::Minimum,
        Statistic::Average => CwStatistic::Average,
        Statistic::SampleCount => CwStatistic::SampleCount,
    }
}

fn statistic_value(point: &Datapoint, statistic: Statistic) -> Option<f64> {
    match statistic {
        Statistic::Sum => point.sum(),
        Statistic::Maximum => point.maximum(),
        Statistic::Minimum => point.minimum(),
        Statistic::Average => point.average(),
        Statistic::SampleCount => point.sample_count(),
    }
}

/// Value of the newest datapoint that carries the requested statistic.
///
/// CloudWatch does not order datapoints; ones without a timestamp sort first.
fn latest_value(points: &[Datapoint], statistic: Statistic) -> Option<f64> {
    points
        .iter()
        .filter_map(|point| {
            let value = statistic_value(point, statistic)?;
            let at = point.timestamp().map_or(f64::MIN, DateTime::as_secs_f64);
            Some((at, value))
        })
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, value)| value)
}
