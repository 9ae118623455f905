//! Magnitude policies — how many replicas a single scaling step adds or
//! removes once a trigger has fired.
//!
//! Both policies return at least 1. Bounds and cooldowns are applied by
//! the decision engine afterwards, so the numbers here may exceed what
//! the deployment can actually absorb.

use sqscale_core::MagnitudePolicyConfig;

/// Values a policy may size a step from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnitudeInputs {
    pub current_replicas: u32,
    pub visible_messages: u64,
    /// Sent count, inflated by backlog when messages are ageing.
    pub adjusted_incoming: f64,
    pub messages_deleted: f64,
    /// Smoothed messages processed per replica per window.
    pub rate_per_replica: f64,
    pub scale_up_threshold: u64,
    pub scale_down_threshold: u64,
}

pub trait ScalingMagnitudePolicy {
    fn scale_up_by(&self, inputs: &MagnitudeInputs) -> u32;
    fn scale_down_by(&self, inputs: &MagnitudeInputs) -> u32;
}

/// Add enough replicas to absorb the incoming surplus at the observed
/// per-replica rate; remove the replicas the current load does not need.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateProportional;

impl ScalingMagnitudePolicy for RateProportional {
    fn scale_up_by(&self, inputs: &MagnitudeInputs) -> u32 {
        if !usable_rate(inputs.rate_per_replica) {
            return 1;
        }
        let surplus = inputs.adjusted_incoming - inputs.messages_deleted;
        at_least_one((surplus / inputs.rate_per_replica).ceil())
    }

    fn scale_down_by(&self, inputs: &MagnitudeInputs) -> u32 {
        if !usable_rate(inputs.rate_per_replica) {
            return 1;
        }
        let capacity = inputs.rate_per_replica * f64::from(inputs.current_replicas);
        let spare = capacity - inputs.adjusted_incoming;
        at_least_one((spare / inputs.rate_per_replica).floor())
    }
}

/// Step by `2^(k - 1)` where `k` is how many times the depth exceeds the
/// scale-up threshold (or the scale-down threshold exceeds the depth),
/// capped at `max_adjustment_per_tick`.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialStep {
    pub max_adjustment_per_tick: u32,
}

impl ScalingMagnitudePolicy for ExponentialStep {
    fn scale_up_by(&self, inputs: &MagnitudeInputs) -> u32 {
        let multiple = inputs.visible_messages / inputs.scale_up_threshold.max(1);
        self.capped(doubling(multiple.saturating_sub(1)))
    }

    fn scale_down_by(&self, inputs: &MagnitudeInputs) -> u32 {
        let multiple = inputs.scale_down_threshold / inputs.visible_messages.max(1);
        self.capped(doubling(multiple.saturating_sub(1)))
    }
}

impl ExponentialStep {
    fn capped(&self, step: u32) -> u32 {
        step.min(self.max_adjustment_per_tick).max(1)
    }
}

impl ScalingMagnitudePolicy for MagnitudePolicyConfig {
    fn scale_up_by(&self, inputs: &MagnitudeInputs) -> u32 {
        match *self {
            MagnitudePolicyConfig::RateProportional => RateProportional.scale_up_by(inputs),
            MagnitudePolicyConfig::ExponentialStep {
                max_adjustment_per_tick,
            } => ExponentialStep {
                max_adjustment_per_tick,
            }
            .scale_up_by(inputs),
        }
    }

    fn scale_down_by(&self, inputs: &MagnitudeInputs) -> u32 {
        match *self {
            MagnitudePolicyConfig::RateProportional => RateProportional.scale_down_by(inputs),
            MagnitudePolicyConfig::ExponentialStep {
                max_adjustment_per_tick,
            } => ExponentialStep {
                max_adjustment_per_tick,
            }
            .scale_down_by(inputs),
        }
    }
}

fn usable_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

fn at_least_one(steps: f64) -> u32 {
    if steps.is_finite() && steps >= 1.0 {
        // Saturating float-to-int cast.
        steps as u32
    } else {
        1
    }
}

fn doubling(exponent: u64) -> u32 {
    1u32 << exponent.min(31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> MagnitudeInputs {
        MagnitudeInputs {
            current_replicas: 2,
            visible_messages: 150,
            adjusted_incoming: 40.0,
            messages_deleted: 20.0,
            rate_per_replica: 10.0,
            scale_up_threshold: 100,
            scale_down_threshold: 10,
        }
    }

    #[test]
    fn rate_proportional_up_covers_surplus() {
        // (40 - 20) / 10 = 2 extra replicas.
        assert_eq!(RateProportional.scale_up_by(&inputs()), 2);

        let mut i = inputs();
        i.adjusted_incoming = 41.0;
        assert_eq!(RateProportional.scale_up_by(&i), 3);
    }

    #[test]
    fn rate_proportional_up_floors_at_one() {
        let mut i = inputs();
        i.adjusted_incoming = 10.0; // deleting faster than sending
        assert_eq!(RateProportional.scale_up_by(&i), 1);
    }

    #[test]
    fn rate_proportional_down_removes_spare_capacity() {
        let i = MagnitudeInputs {
            current_replicas: 6,
            visible_messages: 3,
            adjusted_incoming: 15.0,
            rate_per_replica: 10.0,
            ..inputs()
        };
        // capacity 60, need 15 → floor(45 / 10) = 4.
        assert_eq!(RateProportional.scale_down_by(&i), 4);
    }

    #[test]
    fn rate_proportional_down_floors_at_one() {
        let i = MagnitudeInputs {
            current_replicas: 2,
            visible_messages: 3,
            adjusted_incoming: 50.0,
            ..inputs()
        };
        assert_eq!(RateProportional.scale_down_by(&i), 1);
    }

    #[test]
    fn rate_proportional_with_zero_rate_steps_by_one() {
        let i = MagnitudeInputs {
            rate_per_replica: 0.0,
            ..inputs()
        };
        assert_eq!(RateProportional.scale_up_by(&i), 1);
        assert_eq!(RateProportional.scale_down_by(&i), 1);
    }

    #[test]
    fn exponential_up_doubles_per_threshold_multiple() {
        let policy = ExponentialStep {
            max_adjustment_per_tick: 16,
        };
        let at = |visible| {
            policy.scale_up_by(&MagnitudeInputs {
                visible_messages: visible,
                ..inputs()
            })
        };
        assert_eq!(at(100), 1);
        assert_eq!(at(199), 1);
        assert_eq!(at(200), 2);
        assert_eq!(at(400), 8);
        assert_eq!(at(10_000), 16);
    }

    #[test]
    fn exponential_down_doubles_as_queue_drains() {
        let policy = ExponentialStep {
            max_adjustment_per_tick: 4,
        };
        let at = |visible| {
            policy.scale_down_by(&MagnitudeInputs {
                visible_messages: visible,
                scale_down_threshold: 10,
                ..inputs()
            })
        };
        assert_eq!(at(10), 1);
        assert_eq!(at(5), 2);
        assert_eq!(at(3), 4);
        assert_eq!(at(0), 4);
    }

    #[test]
    fn exponential_never_returns_zero() {
        let policy = ExponentialStep {
            max_adjustment_per_tick: 3,
        };
        let i = MagnitudeInputs {
            visible_messages: 0,
            scale_down_threshold: 0,
            scale_up_threshold: 0,
            ..inputs()
        };
        assert_eq!(policy.scale_down_by(&i), 1);
        assert_eq!(policy.scale_up_by(&i), 1);
    }

    #[test]
    fn exponential_huge_depth_does_not_overflow() {
        let policy = ExponentialStep {
            max_adjustment_per_tick: u32::MAX,
        };
        let i = MagnitudeInputs {
            visible_messages: u64::MAX,
            scale_up_threshold: 1,
            ..inputs()
        };
        assert_eq!(policy.scale_up_by(&i), 1 << 31);
    }

    #[test]
    fn config_dispatches_to_policy() {
        let rate = MagnitudePolicyConfig::RateProportional;
        assert_eq!(rate.scale_up_by(&inputs()), 2);

        let exp = MagnitudePolicyConfig::ExponentialStep {
            max_adjustment_per_tick: 4,
        };
        let i = MagnitudeInputs {
            visible_messages: 300,
            ..inputs()
        };
        assert_eq!(exp.scale_up_by(&i), 4);
    }
}
