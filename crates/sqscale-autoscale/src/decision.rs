//! Scaling decision engine.
//!
//! [`decide`] is a pure function of the snapshot, the scaler state, the
//! config and the current instant. It performs no I/O and never fails.
//!
//! # Algorithm
//!
//! ```text
//! incoming = sent + (age > acceptable ? visible / (acceptable / 60) : 0)
//! observed = deleted / max(replicas, 1)
//!
//! if visible <= scale_down_threshold:   ratchet rate, size step down
//! elif visible >= scale_up_threshold:   ratchet rate, size step up
//! else:                                 rate = observed, NoOp
//!
//! cooldown active for direction → NoOp
//! target = clamp(replicas ± by, min, max); by == 0 after clamp → NoOp
//! ```

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sqscale_core::{MetricSnapshot, ScaleDirection, ScalingConfig};

use crate::policy::{MagnitudeInputs, ScalingMagnitudePolicy};
use crate::state::ScalerState;

/// What the engine wants done this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScaleAction {
    NoOp,
    ScaleUp { by: u32 },
    ScaleDown { by: u32 },
}

impl ScaleAction {
    pub fn direction(&self) -> Option<ScaleDirection> {
        match self {
            ScaleAction::NoOp => None,
            ScaleAction::ScaleUp { .. } => Some(ScaleDirection::Up),
            ScaleAction::ScaleDown { .. } => Some(ScaleDirection::Down),
        }
    }
}

/// Why a tick ended in [`ScaleAction::NoOp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum HoldReason {
    /// Depth is strictly between the two thresholds.
    WithinThresholds,
    /// Depth is low but consumers are not idling on empty receives.
    QueueNotIdle,
    /// A previous scaling in this direction is too recent.
    CooldownActive {
        direction: ScaleDirection,
        remaining: Duration,
    },
    /// The replica bounds leave no room to move.
    AtBound { direction: ScaleDirection },
}

/// Engine output for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleDecision {
    pub action: ScaleAction,
    pub current_replicas: u32,
    /// Clamped replica target. Equals `current_replicas` for a NoOp.
    pub target_replicas: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold: Option<HoldReason>,
}

impl ScaleDecision {
    fn hold(current_replicas: u32, reason: HoldReason) -> Self {
        Self {
            action: ScaleAction::NoOp,
            current_replicas,
            target_replicas: current_replicas,
            hold: Some(reason),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.action == ScaleAction::NoOp
    }
}

/// Incoming message estimate, inflated by the standing backlog when the
/// oldest message is older than `acceptable_age`.
pub fn adjusted_incoming(snapshot: &MetricSnapshot, config: &ScalingConfig) -> f64 {
    if snapshot.oldest_message_age_secs > config.acceptable_age_secs {
        let per_minute = config.acceptable_age_secs / 60.0;
        snapshot.messages_sent + snapshot.visible_messages as f64 / per_minute
    } else {
        snapshot.messages_sent
    }
}

/// Messages deleted per replica. Zero replicas counts as one.
pub fn observed_rate(snapshot: &MetricSnapshot) -> f64 {
    snapshot.messages_deleted / f64::from(snapshot.current_replicas.max(1))
}

/// Turn a snapshot into a scaling decision and the updated scaler state.
///
/// Only the rate estimate changes in the returned state; cooldown clocks
/// move when the executor commits the decision.
pub fn decide(
    snapshot: &MetricSnapshot,
    state: &ScalerState,
    config: &ScalingConfig,
    now: Instant,
) -> (ScaleDecision, ScalerState) {
    let mut next = *state;
    let current = snapshot.current_replicas;
    let visible = snapshot.visible_messages;
    let incoming = adjusted_incoming(snapshot, config);
    let observed = observed_rate(snapshot);

    let direction = if visible <= config.scale_down_threshold {
        ScaleDirection::Down
    } else if visible >= config.scale_up_threshold {
        ScaleDirection::Up
    } else {
        next.settle_rate(observed);
        return (ScaleDecision::hold(current, HoldReason::WithinThresholds), next);
    };

    let rate = next.ratchet_rate(observed);

    if direction == ScaleDirection::Down
        && let Some(min_empty) = config.scale_down_empty_receives
        && snapshot.empty_receives < min_empty
    {
        return (ScaleDecision::hold(current, HoldReason::QueueNotIdle), next);
    }

    let inputs = MagnitudeInputs {
        current_replicas: current,
        visible_messages: visible,
        adjusted_incoming: incoming,
        messages_deleted: snapshot.messages_deleted,
        rate_per_replica: rate,
        scale_up_threshold: config.scale_up_threshold,
        scale_down_threshold: config.scale_down_threshold,
    };
    let by = match direction {
        ScaleDirection::Up => config.policy.scale_up_by(&inputs),
        ScaleDirection::Down => config.policy.scale_down_by(&inputs),
    };

    if let Some(remaining) = next.cooldown_remaining(direction, config, now) {
        return (
            ScaleDecision::hold(current, HoldReason::CooldownActive { direction, remaining }),
            next,
        );
    }

    let (target, effective) = match direction {
        ScaleDirection::Up => {
            let target = config.clamp(i64::from(current) + i64::from(by));
            (target, target.saturating_sub(current))
        }
        ScaleDirection::Down => {
            let target = config.clamp(i64::from(current) - i64::from(by));
            (target, current.saturating_sub(target))
        }
    };

    if effective == 0 {
        return (ScaleDecision::hold(current, HoldReason::AtBound { direction }), next);
    }

    let action = match direction {
        ScaleDirection::Up => ScaleAction::ScaleUp { by: effective },
        ScaleDirection::Down => ScaleAction::ScaleDown { by: effective },
    };
    let decision = ScaleDecision {
        action,
        current_replicas: current,
        target_replicas: target,
        hold: None,
    };
    (decision, next)
}
