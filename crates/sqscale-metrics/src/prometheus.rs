//! Prometheus text exposition format.
//!
//! Renders a telemetry snapshot into the Prometheus text exposition
//! format for scraping by a Prometheus server or compatible agent.

use crate::telemetry::TelemetrySnapshot;

/// Labels attached to every sample.
#[derive(Debug, Clone)]
pub struct MetricLabels {
    pub queue: String,
    pub deployment: String,
}

/// Render a telemetry snapshot into Prometheus text format.
///
/// Produces COUNTER and GAUGE metrics with `queue` and `deployment` labels.
/// The smoothed rate is omitted until it is known.
pub fn render_prometheus(snapshot: &TelemetrySnapshot, labels: &MetricLabels) -> String {
    let mut out = String::new();
    let l = format!(
        "queue=\"{}\",deployment=\"{}\"",
        escape(&labels.queue),
        escape(&labels.deployment)
    );

    let counters: [(&str, &str, u64); 6] = [
        ("sqscale_ticks_total", "Poll ticks evaluated.", snapshot.ticks_total),
        (
            "sqscale_ticks_aborted_total",
            "Ticks aborted by a collection failure.",
            snapshot.ticks_aborted,
        ),
        ("sqscale_scale_ups_total", "Committed scale-ups.", snapshot.scale_ups),
        ("sqscale_scale_downs_total", "Committed scale-downs.", snapshot.scale_downs),
        (
            "sqscale_scale_write_failures_total",
            "Replica updates rejected by the controller.",
            snapshot.write_failures,
        ),
        (
            "sqscale_cooldown_holds_total",
            "Scaling actions held back by a cooldown.",
            snapshot.cooldown_holds,
        ),
    ];
    for (name, help, value) in counters {
        out.push_str(&format!("# HELP {name} {help}\n"));
        out.push_str(&format!("# TYPE {name} counter\n"));
        out.push_str(&format!("{name}{{{l}}} {value}\n"));
    }

    out.push_str("# HELP sqscale_queue_visible_messages Approximate visible messages.\n");
    out.push_str("# TYPE sqscale_queue_visible_messages gauge\n");
    out.push_str(&format!(
        "sqscale_queue_visible_messages{{{l}}} {}\n",
        snapshot.visible_messages
    ));

    out.push_str("# HELP sqscale_queue_oldest_message_age_seconds Age of the oldest message.\n");
    out.push_str("# TYPE sqscale_queue_oldest_message_age_seconds gauge\n");
    out.push_str(&format!(
        "sqscale_queue_oldest_message_age_seconds{{{l}}} {:.2}\n",
        snapshot.oldest_message_age_secs
    ));

    out.push_str("# HELP sqscale_replicas Available replicas at the last tick.\n");
    out.push_str("# TYPE sqscale_replicas gauge\n");
    out.push_str(&format!("sqscale_replicas{{{l}}} {}\n", snapshot.current_replicas));

    out.push_str("# HELP sqscale_target_replicas Last replica target.\n");
    out.push_str("# TYPE sqscale_target_replicas gauge\n");
    out.push_str(&format!(
        "sqscale_target_replicas{{{l}}} {}\n",
        snapshot.target_replicas
    ));

    out.push_str(
        "# HELP sqscale_rate_per_replica Smoothed messages processed per replica per minute.\n",
    );
    out.push_str("# TYPE sqscale_rate_per_replica gauge\n");
    if let Some(rate) = snapshot.smoothed_rate_per_replica {
        out.push_str(&format!("sqscale_rate_per_replica{{{l}}} {rate:.2}\n"));
    }

    out
}

fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_labels() -> MetricLabels {
        MetricLabels {
            queue: "jobs".to_string(),
            deployment: "batch/worker".to_string(),
        }
    }

    fn test_snapshot() -> TelemetrySnapshot {
        TelemetrySnapshot {
            ticks_total: 12,
            ticks_aborted: 1,
            scale_ups: 3,
            scale_downs: 2,
            write_failures: 0,
            cooldown_holds: 4,
            visible_messages: 150,
            oldest_message_age_secs: 31.5,
            current_replicas: 2,
            target_replicas: 4,
            smoothed_rate_per_replica: Some(10.0),
        }
    }

    #[test]
    fn render_counters_and_gauges() {
        let output = render_prometheus(&test_snapshot(), &test_labels());
        let l = "queue=\"jobs\",deployment=\"batch/worker\"";

        assert!(output.contains("# TYPE sqscale_ticks_total counter"));
        assert!(output.contains(&format!("sqscale_ticks_total{{{l}}} 12")));
        assert!(output.contains(&format!("sqscale_scale_ups_total{{{l}}} 3")));
        assert!(output.contains(&format!("sqscale_queue_visible_messages{{{l}}} 150")));
        assert!(output.contains(&format!(
            "sqscale_queue_oldest_message_age_seconds{{{l}}} 31.50"
        )));
        assert!(output.contains(&format!("sqscale_target_replicas{{{l}}} 4")));
        assert!(output.contains(&format!("sqscale_rate_per_replica{{{l}}} 10.00")));
    }

    #[test]
    fn unknown_rate_is_omitted() {
        let mut snap = test_snapshot();
        snap.smoothed_rate_per_replica = None;
        let output = render_prometheus(&snap, &test_labels());
        assert!(output.contains("# TYPE sqscale_rate_per_replica gauge"));
        assert!(!output.contains("sqscale_rate_per_replica{"));
    }

    #[test]
    fn labels_are_escaped() {
        let labels = MetricLabels {
            queue: "we\"ird".to_string(),
            deployment: "a\\b".to_string(),
        };
        let output = render_prometheus(&test_snapshot(), &labels);
        assert!(output.contains("queue=\"we\\\"ird\",deployment=\"a\\\\b\""));
    }

    #[test]
    fn render_format_is_prometheus_compatible() {
        let output = render_prometheus(&test_snapshot(), &test_labels());

        // Every non-empty, non-comment line should match: metric_name{labels} value
        for line in output.lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            assert!(
                line.contains('{') && line.contains('}'),
                "line should have labels: {line}"
            );
            assert!(line.starts_with("sqscale_"), "unexpected metric: {line}");
        }
    }
}
