//! Per-tick metric snapshot and the signals that populate it.

use serde::{Deserialize, Serialize};

use crate::source::Statistic;

/// Every value the decision engine reads in one tick.
///
/// A snapshot is only ever built complete; a tick whose collection
/// fails never produces one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    /// Age of the oldest visible message, in seconds.
    pub oldest_message_age_secs: f64,
    /// Messages deleted (processed) over the sampling window.
    pub messages_deleted: f64,
    /// Messages sent to the queue over the sampling window.
    pub messages_sent: f64,
    /// Receive calls that returned nothing over the sampling window.
    pub empty_receives: f64,
    /// Approximate number of visible messages right now.
    pub visible_messages: u64,
    /// Available replicas at collection time.
    pub current_replicas: u32,
}

/// One input signal of a [`MetricSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    OldestMessageAge,
    MessagesDeleted,
    MessagesSent,
    EmptyReceives,
    VisibleMessages,
    CurrentReplicas,
}

impl Signal {
    /// Signals served by the metric source, in collection order.
    pub const METRICS: [Signal; 4] = [
        Signal::OldestMessageAge,
        Signal::MessagesDeleted,
        Signal::MessagesSent,
        Signal::EmptyReceives,
    ];

    /// Queue metric name and aggregation for metric-source signals.
    pub fn metric(self) -> Option<(&'static str, Statistic)> {
        match self {
            Signal::OldestMessageAge => Some(("ApproximateAgeOfOldestMessage", Statistic::Maximum)),
            Signal::MessagesDeleted => Some(("NumberOfMessagesDeleted", Statistic::Sum)),
            Signal::MessagesSent => Some(("NumberOfMessagesSent", Statistic::Sum)),
            Signal::EmptyReceives => Some(("NumberOfEmptyReceives", Statistic::Sum)),
            Signal::VisibleMessages | Signal::CurrentReplicas => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Signal::OldestMessageAge => "oldest message age",
            Signal::MessagesDeleted => "messages deleted",
            Signal::MessagesSent => "messages sent",
            Signal::EmptyReceives => "empty receives",
            Signal::VisibleMessages => "visible messages",
            Signal::CurrentReplicas => "current replicas",
        }
    }
}

/// Direction of a scaling action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleDirection {
    Up,
    Down,
}

impl std::fmt::Display for ScaleDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleDirection::Up => f.write_str("up"),
            ScaleDirection::Down => f.write_str("down"),
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_signals_have_queue_metrics() {
        for signal in Signal::METRICS {
            assert!(signal.metric().is_some(), "{signal} should map to a metric");
        }
        assert!(Signal::VisibleMessages.metric().is_none());
        assert!(Signal::CurrentReplicas.metric().is_none());
    }

    #[test]
    fn age_uses_maximum_counters_use_sum() {
        assert_eq!(
            Signal::OldestMessageAge.metric().map(|(_, s)| s),
            Some(Statistic::Maximum)
        );
        assert_eq!(
            Signal::MessagesSent.metric().map(|(_, s)| s),
            Some(Statistic::Sum)
        );
    }
}
