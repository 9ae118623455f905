//! sqscale-autoscale — queue-depth driven replica scaling.
//!
//! Samples queue metrics each tick, compares queue depth against the
//! scale-up/scale-down thresholds, sizes the step with a magnitude
//! policy and applies it through the replica controller. Cooldown
//! windows prevent thrashing.
//!
//! # Tick
//!
//! ```text
//! Autoscaler::run
//!   └── tick()
//!         ├── SnapshotCollector::collect()   any failure → abort tick
//!         ├── decide()                       pure, updates rate estimate
//!         └── ActionExecutor::execute()      success → cooldown clock moves
//! ```

pub mod collector;
pub mod decision;
pub mod error;
pub mod executor;
pub mod policy;
pub mod scaler;
pub mod state;

pub use collector::{Collaborators, SnapshotCollector, METRIC_WINDOW};
pub use decision::{decide, HoldReason, ScaleAction, ScaleDecision};
pub use error::{TickError, TickResult};
pub use executor::ActionExecutor;
pub use policy::{ExponentialStep, MagnitudeInputs, RateProportional, ScalingMagnitudePolicy};
pub use scaler::{Autoscaler, TickOutcome, TickReport, TickStatus};
pub use state::ScalerState;
