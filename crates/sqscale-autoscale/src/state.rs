//! Scaler state — cooldown timestamps and the per-replica rate estimate.
//!
//! One instance lives for the whole process. Nothing here is persisted:
//! a restart begins with fresh cooldowns and an unknown rate.

use std::time::{Duration, Instant};

use sqscale_core::{ScaleDirection, ScalingConfig};

use crate::decision::ScaleAction;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalerState {
    last_scale_up_at: Instant,
    last_scale_down_at: Instant,
    /// Messages processed per replica per sampling window. `None` until
    /// the first observation.
    smoothed_rate_per_replica: Option<f64>,
}

impl ScalerState {
    /// Both cooldown clocks start at `started_at`.
    pub fn new(started_at: Instant) -> Self {
        Self {
            last_scale_up_at: started_at,
            last_scale_down_at: started_at,
            smoothed_rate_per_replica: None,
        }
    }

    /// Seed the rate estimate.
    pub fn with_smoothed_rate(mut self, rate: f64) -> Self {
        self.smoothed_rate_per_replica = Some(rate);
        self
    }

    pub fn last_scale_up_at(&self) -> Instant {
        self.last_scale_up_at
    }

    pub fn last_scale_down_at(&self) -> Instant {
        self.last_scale_down_at
    }

    pub fn smoothed_rate_per_replica(&self) -> Option<f64> {
        self.smoothed_rate_per_replica
    }

    /// Advance the cooldown clock for a scaling action that was applied.
    pub fn record_committed_decision(&mut self, action: &ScaleAction, now: Instant) {
        match action {
            ScaleAction::ScaleUp { .. } => self.last_scale_up_at = now,
            ScaleAction::ScaleDown { .. } => self.last_scale_down_at = now,
            ScaleAction::NoOp => {}
        }
    }

    /// Time left before `direction` may scale again, if any.
    pub fn cooldown_remaining(
        &self,
        direction: ScaleDirection,
        config: &ScalingConfig,
        now: Instant,
    ) -> Option<Duration> {
        let (last, cooldown) = match direction {
            ScaleDirection::Up => (self.last_scale_up_at, config.scale_up_cooldown),
            ScaleDirection::Down => (self.last_scale_down_at, config.scale_down_cooldown),
        };
        match last.checked_add(cooldown) {
            Some(ready_at) if now < ready_at => Some(ready_at - now),
            Some(_) => None,
            None => Some(Duration::MAX),
        }
    }

    /// Raise the estimate to `observed` if it is unknown or lower. Returns
    /// the estimate after the update. Never lowers it.
    pub(crate) fn ratchet_rate(&mut self, observed: f64) -> f64 {
        if observed.is_finite() {
            match self.smoothed_rate_per_replica {
                Some(rate) if rate >= observed => {}
                _ => self.smoothed_rate_per_replica = Some(observed),
            }
        }
        self.smoothed_rate_per_replica.unwrap_or(0.0)
    }

    /// Replace the estimate with the plain observation (steady state).
    pub(crate) fn settle_rate(&mut self, observed: f64) {
        if observed.is_finite() {
            self.smoothed_rate_per_replica = Some(observed);
        }
    }
}
