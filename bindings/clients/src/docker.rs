use crate::bin_path::{binary_path, DOCKER_PATH_ENV};
use crate::command::run_command;
use async_trait::async_trait;
use logbench_runner::prelude::{
    Deployer, DeployerError, DeploymentSpec, WorkloadHandle, WorkloadStatus,
};
use std::path::PathBuf;

/// Runs each replica of a workload as a detached container, for benchmarking against a local
/// log service.
///
/// Namespaces have no meaning for docker and are ignored.
#[derive(Debug, Clone)]
pub struct DockerDeployer {
    docker: PathBuf,
    network: Option<String>,
}

impl DockerDeployer {
    pub fn new(docker: PathBuf, network: Option<String>) -> Self {
        Self { docker, network }
    }

    pub fn from_env(network: Option<String>) -> anyhow::Result<Self> {
        Ok(Self::new(binary_path("docker", DOCKER_PATH_ENV)?, network))
    }

    fn run_args(&self, spec: &DeploymentSpec, container: &str) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            container.to_string(),
        ];
        if let Some(network) = &self.network {
            args.push("--network".to_string());
            args.push(network.clone());
        }
        for (key, value) in &spec.labels {
            args.push("--label".to_string());
            args.push(format!("{key}={value}"));
        }
        args.push(spec.image.clone());
        args.extend(spec.args.iter().cloned());
        args
    }

    async fn remove(&self, containers: &[String]) -> anyhow::Result<()> {
        if containers.is_empty() {
            return Ok(());
        }

        let mut args = vec!["rm".to_string(), "-f".to_string()];
        args.extend(containers.iter().cloned());

        let output = run_command(&self.docker, &args, None).await?;
        if !output.success {
            anyhow::bail!(
                "docker rm failed for {}: {}",
                containers.join(", "),
                output.stderr.trim()
            );
        }

        Ok(())
    }
}

#[async_trait]
impl Deployer for DockerDeployer {
    async fn create(&self, spec: &DeploymentSpec) -> Result<WorkloadHandle, DeployerError> {
        let mut started = Vec::with_capacity(spec.replicas as usize);

        for i in 0..spec.replicas {
            let container = format!("{}-{i}", spec.name);
            let output = run_command(&self.docker, &self.run_args(spec, &container), None).await;

            let failure = match output {
                Ok(output) if output.success => {
                    started.push(container);
                    continue;
                }
                Ok(output) => anyhow::anyhow!(
                    "docker run failed for {container}: {}",
                    output.stderr.trim()
                ),
                Err(e) => e,
            };

            // Leave nothing behind for a workload the caller never received a handle for.
            if let Err(e) = self.remove(&started).await {
                log::warn!("Failed to remove partially created workload {}: {e:?}", spec.name);
            }
            return Err(failure.into());
        }

        Ok(WorkloadHandle::for_spec(spec).with_instances(started))
    }

    async fn get(&self, handle: &WorkloadHandle) -> Result<WorkloadStatus, DeployerError> {
        if handle.instances.is_empty() {
            return Ok(WorkloadStatus { ready_replicas: 0 });
        }

        let mut args = vec![
            "inspect".to_string(),
            "--format".to_string(),
            "{{.State.Running}}".to_string(),
        ];
        args.extend(handle.instances.iter().cloned());

        // `docker inspect` exits non-zero if any container is missing but still prints the others.
        let output = run_command(&self.docker, &args, None).await?;

        let running = output
            .stdout
            .lines()
            .filter(|line| line.trim() == "true")
            .count() as u32;

        if !output.success && output.stdout.trim().is_empty() {
            if output.stderr.contains("No such object") {
                return Err(DeployerError::NotFound(handle.name.clone()));
            }
            return Err(anyhow::anyhow!(
                "docker inspect failed for {}: {}",
                handle.name,
                output.stderr.trim()
            )
            .into());
        }

        Ok(WorkloadStatus {
            ready_replicas: running,
        })
    }

    async fn delete(&self, handle: &WorkloadHandle) -> Result<(), DeployerError> {
        self.remove(&handle.instances).await?;
        Ok(())
    }
}
