//! sqscale-kube — Deployment-backed [`ReplicaController`].
//!
//! Reads `status.availableReplicas` and writes the replica count through
//! the `scale` subresource with a merge patch. The controller clamps every
//! requested count into its own `[min, max]` range before writing, so a
//! bad target from upstream never reaches the cluster.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v1::Scale;
use kube::Client;
use kube::api::{Api, Patch, PatchParams};
use serde_json::json;
use tracing::debug;

use sqscale_core::{BoxFuture, ReplicaController, SourceError, SourceResult, WorkloadConfig};

const FIELD_MANAGER: &str = "sqscale";

#[derive(Clone)]
pub struct KubeReplicaController {
    client: Client,
    min_replicas: u32,
    max_replicas: u32,
}

impl KubeReplicaController {
    pub fn new(client: Client, min_replicas: u32, max_replicas: u32) -> Self {
        Self {
            client,
            min_replicas,
            max_replicas,
        }
    }

    /// Connect with the ambient kubeconfig or in-cluster service account.
    pub async fn connect(min_replicas: u32, max_replicas: u32) -> Result<Self, kube::Error> {
        let client = Client::try_default().await?;
        Ok(Self::new(client, min_replicas, max_replicas))
    }

    fn deployments(&self, workload: &WorkloadConfig) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), &workload.namespace)
    }
}

impl ReplicaController for KubeReplicaController {
    fn current_replicas<'a>(
        &'a self,
        workload: &'a WorkloadConfig,
    ) -> BoxFuture<'a, SourceResult<u32>> {
        Box::pin(async move {
            let deployment = self
                .deployments(workload)
                .get(&workload.deployment)
                .await
                .map_err(|e| SourceError::request("kubernetes", e.to_string()))?;
            let available = available_replicas(&deployment);
            debug!(%workload, available, "deployment status");
            Ok(available)
        })
    }

    fn set_replicas<'a>(
        &'a self,
        workload: &'a WorkloadConfig,
        target: u32,
    ) -> BoxFuture<'a, SourceResult<u32>> {
        Box::pin(async move {
            let replicas = clamp_replicas(target, self.min_replicas, self.max_replicas);
            let patch_replicas = i32::try_from(replicas).unwrap_or(i32::MAX);
            let patch = json!({ "spec": { "replicas": patch_replicas } });
            let params = PatchParams::apply(FIELD_MANAGER);

            let scale = self
                .deployments(workload)
                .patch_scale(&workload.deployment, &params, &Patch::Merge(&patch))
                .await
                .map_err(|e| SourceError::request("kubernetes", e.to_string()))?;

            let applied = applied_replicas(&scale, replicas);
            debug!(%workload, requested = target, applied, "deployment scaled");
            Ok(applied)
        })
    }
}

/// `status.availableReplicas`; absent or negative reads as zero.
fn available_replicas(deployment: &Deployment) -> u32 {
    deployment
        .status
        .as_ref()
        .and_then(|status| status.available_replicas)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

/// Clamp into `[min, max]`. With `min > max` the upper bound wins.
fn clamp_replicas(target: u32, min: u32, max: u32) -> u32 {
    target.max(min).min(max)
}

/// Replica count the `scale` response reports; `requested` when it
/// carries none, zero when negative.
fn applied_replicas(scale: &Scale, requested: u32) -> u32 {
    scale
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .map_or(requested, |r| u32::try_from(r).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::apps::v1::DeploymentStatus;
    use k8s_openapi::api::autoscaling::v1::ScaleSpec;

    use super::*;

    #[test]
    fn clamps_into_range() {
        assert_eq!(clamp_replicas(0, 1, 5), 1);
        assert_eq!(clamp_replicas(3, 1, 5), 3);
        assert_eq!(clamp_replicas(50, 1, 5), 5);
        assert_eq!(clamp_replicas(0, 0, 5), 0);
    }

    #[test]
    fn clamp_keeps_full_range() {
        assert_eq!(clamp_replicas(u32::MAX, 0, u32::MAX), u32::MAX);
        assert_eq!(clamp_replicas(7, 9, 4), 4);
    }

    fn scale_with(spec: Option<ScaleSpec>) -> Scale {
        Scale {
            spec,
            ..Default::default()
        }
    }

    #[test]
    fn applied_reads_scale_spec() {
        let scale = scale_with(Some(ScaleSpec { replicas: Some(3) }));
        assert_eq!(applied_replicas(&scale, 5), 3);
    }

    #[test]
    fn applied_falls_back_to_request() {
        assert_eq!(applied_replicas(&scale_with(None), 4), 4);
        assert_eq!(
            applied_replicas(&scale_with(Some(ScaleSpec { replicas: None })), 4),
            4
        );
    }

    #[test]
    fn negative_applied_reads_as_zero() {
        let scale = scale_with(Some(ScaleSpec { replicas: Some(-1) }));
        assert_eq!(applied_replicas(&scale, 2), 0);
    }

    #[test]
    fn available_defaults_to_zero() {
        let mut deployment = Deployment::default();
        assert_eq!(available_replicas(&deployment), 0);

        deployment.status = Some(DeploymentStatus::default());
        assert_eq!(available_replicas(&deployment), 0);

        deployment.status = Some(DeploymentStatus {
            available_replicas: Some(4),
            replicas: Some(6),
            ..Default::default()
        });
        assert_eq!(available_replicas(&deployment), 4);
    }

    #[test]
    fn negative_available_reads_as_zero() {
        let deployment = Deployment {
            status: Some(DeploymentStatus {
                available_replicas: Some(-2),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(available_replicas(&deployment), 0);
    }
}
