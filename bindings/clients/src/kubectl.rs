use crate::bin_path::{binary_path, KUBECTL_PATH_ENV};
use crate::command::run_command;
use anyhow::Context;
use async_trait::async_trait;
use logbench_runner::prelude::{
    Deployer, DeployerError, DeploymentSpec, WorkloadHandle, WorkloadStatus,
};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;

/// Manages workloads as Kubernetes Deployments by shelling out to `kubectl`.
#[derive(Debug, Clone)]
pub struct KubectlDeployer {
    kubectl: PathBuf,
}

#[derive(Debug, Deserialize)]
struct DeploymentObject {
    #[serde(default)]
    status: DeploymentStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentStatus {
    /// Omitted by the API server while no replica is ready.
    #[serde(default)]
    ready_replicas: u32,
}

impl KubectlDeployer {
    pub fn new(kubectl: PathBuf) -> Self {
        Self { kubectl }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::new(binary_path("kubectl", KUBECTL_PATH_ENV)?))
    }
}

fn manifest(spec: &DeploymentSpec) -> serde_json::Value {
    let mut pod_spec = json!({
        "containers": [{
            "name": spec.name,
            "image": spec.image,
            "args": spec.args,
        }],
    });
    if let Some(account) = &spec.service_account {
        pod_spec["serviceAccountName"] = json!(account);
    }

    json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {
            "name": spec.name,
            "namespace": spec.namespace,
            "labels": spec.labels,
        },
        "spec": {
            "replicas": spec.replicas,
            "selector": { "matchLabels": spec.labels },
            "template": {
                "metadata": { "labels": spec.labels },
                "spec": pod_spec,
            },
        },
    })
}

fn is_not_found(stderr: &str) -> bool {
    stderr.contains("NotFound") || stderr.contains("not found")
}

#[async_trait]
impl Deployer for KubectlDeployer {
    async fn create(&self, spec: &DeploymentSpec) -> Result<WorkloadHandle, DeployerError> {
        let manifest =
            serde_json::to_vec(&manifest(spec)).context("Failed to serialize deployment")?;

        let output = run_command(
            &self.kubectl,
            &["create".to_string(), "-f".to_string(), "-".to_string()],
            Some(&manifest),
        )
        .await?;

        if !output.success {
            return Err(anyhow::anyhow!(
                "kubectl create failed for {}/{}: {}",
                spec.namespace,
                spec.name,
                output.stderr.trim()
            )
            .into());
        }

        Ok(WorkloadHandle::for_spec(spec))
    }

    async fn get(&self, handle: &WorkloadHandle) -> Result<WorkloadStatus, DeployerError> {
        let output = run_command(
            &self.kubectl,
            &[
                "get".to_string(),
                "deployment".to_string(),
                handle.name.clone(),
                "-n".to_string(),
                handle.namespace.clone(),
                "-o".to_string(),
                "json".to_string(),
            ],
            None,
        )
        .await?;

        if !output.success {
            if is_not_found(&output.stderr) {
                return Err(DeployerError::NotFound(handle.name.clone()));
            }
            return Err(anyhow::anyhow!(
                "kubectl get failed for {}/{}: {}",
                handle.namespace,
                handle.name,
                output.stderr.trim()
            )
            .into());
        }

        let deployment: DeploymentObject = serde_json::from_str(&output.stdout)
            .with_context(|| format!("Unexpected kubectl output for {}", handle.name))?;

        Ok(WorkloadStatus {
            ready_replicas: deployment.status.ready_replicas,
        })
    }

    async fn delete(&self, handle: &WorkloadHandle) -> Result<(), DeployerError> {
        let output = run_command(
            &self.kubectl,
            &[
                "delete".to_string(),
                "deployment".to_string(),
                handle.name.clone(),
                "-n".to_string(),
                handle.namespace.clone(),
                "--wait=false".to_string(),
            ],
            None,
        )
        .await?;

        if !output.success {
            if is_not_found(&output.stderr) {
                return Err(DeployerError::NotFound(handle.name.clone()));
            }
            return Err(anyhow::anyhow!(
                "kubectl delete failed for {}/{}: {}",
                handle.namespace,
                handle.name,
                output.stderr.trim()
            )
            .into());
        }

        Ok(())
    }
}
