//! Autoscaler telemetry — lock-free counters and gauges.
//!
//! Floating-point gauges are stored as their bit pattern in an
//! `AtomicU64`; an unknown rate is stored as NaN.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use sqscale_core::{MetricSnapshot, ScaleDirection};

/// Shared between the poll driver (writer) and the status server (reader).
#[derive(Debug)]
pub struct ScalerTelemetry {
    ticks_total: AtomicU64,
    ticks_aborted: AtomicU64,
    scale_ups: AtomicU64,
    scale_downs: AtomicU64,
    write_failures: AtomicU64,
    cooldown_holds: AtomicU64,

    visible_messages: AtomicU64,
    oldest_message_age_secs: AtomicU64,
    current_replicas: AtomicU64,
    target_replicas: AtomicU64,
    smoothed_rate_per_replica: AtomicU64,
}

/// Point-in-time copy of [`ScalerTelemetry`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub ticks_total: u64,
    pub ticks_aborted: u64,
    pub scale_ups: u64,
    pub scale_downs: u64,
    pub write_failures: u64,
    pub cooldown_holds: u64,
    pub visible_messages: u64,
    pub oldest_message_age_secs: f64,
    pub current_replicas: u64,
    pub target_replicas: u64,
    pub smoothed_rate_per_replica: Option<f64>,
}

impl Default for ScalerTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl ScalerTelemetry {
    pub fn new() -> Self {
        Self {
            ticks_total: AtomicU64::new(0),
            ticks_aborted: AtomicU64::new(0),
            scale_ups: AtomicU64::new(0),
            scale_downs: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            cooldown_holds: AtomicU64::new(0),
            visible_messages: AtomicU64::new(0),
            oldest_message_age_secs: AtomicU64::new(0f64.to_bits()),
            current_replicas: AtomicU64::new(0),
            target_replicas: AtomicU64::new(0),
            smoothed_rate_per_replica: AtomicU64::new(f64::NAN.to_bits()),
        }
    }

    pub fn record_tick(&self) {
        self.ticks_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_abort(&self) {
        self.ticks_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cooldown_hold(&self) {
        self.cooldown_holds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a committed scaling and remember the replica count set.
    pub fn record_scaled(&self, direction: ScaleDirection, applied: u32) {
        match direction {
            ScaleDirection::Up => self.scale_ups.fetch_add(1, Ordering::Relaxed),
            ScaleDirection::Down => self.scale_downs.fetch_add(1, Ordering::Relaxed),
        };
        self.target_replicas
            .store(u64::from(applied), Ordering::Relaxed);
    }

    pub fn observe_snapshot(&self, snapshot: &MetricSnapshot) {
        self.visible_messages
            .store(snapshot.visible_messages, Ordering::Relaxed);
        self.oldest_message_age_secs
            .store(snapshot.oldest_message_age_secs.to_bits(), Ordering::Relaxed);
        self.current_replicas
            .store(u64::from(snapshot.current_replicas), Ordering::Relaxed);
    }

    pub fn observe_target(&self, target: u32) {
        self.target_replicas
            .store(u64::from(target), Ordering::Relaxed);
    }

    pub fn observe_rate(&self, rate: Option<f64>) {
        let bits = rate.unwrap_or(f64::NAN).to_bits();
        self.smoothed_rate_per_replica
            .store(bits, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let rate = f64::from_bits(self.smoothed_rate_per_replica.load(Ordering::Relaxed));
        TelemetrySnapshot {
            ticks_total: self.ticks_total.load(Ordering::Relaxed),
            ticks_aborted: self.ticks_aborted.load(Ordering::Relaxed),
            scale_ups: self.scale_ups.load(Ordering::Relaxed),
            scale_downs: self.scale_downs.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            cooldown_holds: self.cooldown_holds.load(Ordering::Relaxed),
            visible_messages: self.visible_messages.load(Ordering::Relaxed),
            oldest_message_age_secs: f64::from_bits(
                self.oldest_message_age_secs.load(Ordering::Relaxed),
            ),
            current_replicas: self.current_replicas.load(Ordering::Relaxed),
            target_replicas: self.target_replicas.load(Ordering::Relaxed),
            smoothed_rate_per_replica: (!rate.is_nan()).then_some(rate),
        }
    }
}
