//! Action executor — applies a scaling decision through the replica
//! controller and commits it to the scaler state on success.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use sqscale_core::{ReplicaController, WorkloadConfig};

use crate::collector::bounded;
use crate::decision::ScaleDecision;
use crate::error::{TickError, TickResult};
use crate::state::ScalerState;

pub struct ActionExecutor {
    replicas: Arc<dyn ReplicaController>,
    workload: WorkloadConfig,
    call_timeout: Duration,
}

impl ActionExecutor {
    pub fn new(
        replicas: Arc<dyn ReplicaController>,
        workload: WorkloadConfig,
        call_timeout: Duration,
    ) -> Self {
        Self {
            replicas,
            workload,
            call_timeout,
        }
    }

    /// Apply `decision`. Returns the replica count the controller set, or
    /// `None` for a NoOp.
    ///
    /// On failure the cooldown clocks are left untouched so the same
    /// action is eligible again on the next tick.
    pub async fn execute(
        &self,
        decision: &ScaleDecision,
        state: &mut ScalerState,
        now: Instant,
    ) -> TickResult<Option<u32>> {
        let Some(direction) = decision.action.direction() else {
            return Ok(None);
        };
        let target = decision.target_replicas;

        let applied = bounded(
            "replica write",
            self.call_timeout,
            self.replicas.set_replicas(&self.workload, target),
        )
        .await
        .map_err(|source| TickError::ReplicaWrite { target, source })?;

        state.record_committed_decision(&decision.action, now);
        info!(
            workload = %self.workload,
            %direction,
            from = decision.current_replicas,
            to = target,
            applied,
            "scale successful"
        );
        Ok(Some(applied))
    }
}
