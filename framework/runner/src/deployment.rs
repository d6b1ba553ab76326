use crate::error::BenchError;
use async_trait::async_trait;
use logbench_core::prelude::{poll_until, PollError};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Everything a deployer needs to start a workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentSpec {
    pub name: String,
    pub namespace: String,
    pub image: String,
    pub replicas: u32,
    pub args: Vec<String>,
    pub labels: BTreeMap<String, String>,
    pub service_account: Option<String>,
}

/// Refers to a workload that a [Deployer] has created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadHandle {
    pub name: String,
    pub namespace: String,
    /// The replica count the workload must reach to be ready.
    pub replicas: u32,
    /// Deployer specific names of the instances backing the workload, such as container names.
    pub instances: Vec<String>,
}

impl WorkloadHandle {
    pub fn for_spec(spec: &DeploymentSpec) -> Self {
        Self {
            name: spec.name.clone(),
            namespace: spec.namespace.clone(),
            replicas: spec.replicas,
            instances: Vec::new(),
        }
    }

    pub fn with_instances(mut self, instances: Vec<String>) -> Self {
        self.instances = instances;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadStatus {
    pub ready_replicas: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum DeployerError {
    /// The workload does not exist, or does not exist yet.
    #[error("workload '{0}' not found")]
    NotFound(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Creates, inspects and removes workloads on a cluster or container runtime.
///
/// Nothing is cached between calls. Calling [Deployer::create] twice for the same name without a
/// [Deployer::delete] in between is not supported.
#[async_trait]
pub trait Deployer: Send + Sync {
    async fn create(&self, spec: &DeploymentSpec) -> Result<WorkloadHandle, DeployerError>;

    async fn get(&self, handle: &WorkloadHandle) -> Result<WorkloadStatus, DeployerError>;

    async fn delete(&self, handle: &WorkloadHandle) -> Result<(), DeployerError>;
}

/// Wraps a [Deployer] with readiness polling and error context.
#[derive(Clone)]
pub struct DeploymentLifecycleManager {
    deployer: Arc<dyn Deployer>,
    poll_interval: Duration,
    timeout: Duration,
}

impl DeploymentLifecycleManager {
    pub fn new(deployer: Arc<dyn Deployer>, poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            deployer,
            poll_interval,
            timeout,
        }
    }

    pub async fn create(&self, spec: &DeploymentSpec) -> Result<WorkloadHandle, BenchError> {
        log::info!(
            "Creating workload {}/{} with {} replicas",
            spec.namespace,
            spec.name,
            spec.replicas
        );

        self.deployer
            .create(spec)
            .await
            .map_err(|source| BenchError::Deployment {
                name: spec.name.clone(),
                source,
            })
    }

    /// Poll until the workload reports all of its replicas ready.
    ///
    /// A workload that cannot be found yet is treated as not ready. Any other lookup failure ends
    /// the wait immediately.
    pub async fn wait_ready(&self, handle: &WorkloadHandle) -> Result<(), BenchError> {
        let deployer = self.deployer.as_ref();
        let ready = &Mutex::new(0u32);

        let result = poll_until(self.poll_interval, self.timeout, move || async move {
            match deployer.get(handle).await {
                Ok(status) => {
                    *ready.lock() = status.ready_replicas;
                    log::debug!(
                        "Workload {} has {}/{} replicas ready",
                        handle.name,
                        status.ready_replicas,
                        handle.replicas
                    );
                    Ok(status.ready_replicas >= handle.replicas)
                }
                Err(DeployerError::NotFound(_)) => {
                    log::debug!("Workload {} not found yet", handle.name);
                    Ok(false)
                }
                Err(e) => Err(e),
            }
        })
        .await;

        match result {
            Ok(_) => {
                log::info!("Workload {} is ready", handle.name);
                Ok(())
            }
            Err(PollError::TimedOut { .. }) => Err(BenchError::ReadinessTimeout {
                name: handle.name.clone(),
                timeout: self.timeout,
                ready_replicas: *ready.lock(),
                desired_replicas: handle.replicas,
            }),
            Err(PollError::Aborted(source)) => Err(BenchError::Deployment {
                name: handle.name.clone(),
                source,
            }),
        }
    }

    pub async fn delete(&self, handle: WorkloadHandle) -> Result<(), BenchError> {
        log::info!("Deleting workload {}/{}", handle.namespace, handle.name);

        self.deployer
            .delete(&handle)
            .await
            .map_err(|source| BenchError::Deployment {
                name: handle.name,
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDeployer;
    use tokio::time::Instant;

    fn spec(name: &str) -> DeploymentSpec {
        DeploymentSpec {
            name: name.to_string(),
            namespace: "bench".to_string(),
            image: "example/generator:latest".to_string(),
            replicas: 2,
            args: vec![],
            labels: BTreeMap::new(),
            service_account: None,
        }
    }

    fn manager(deployer: Arc<FakeDeployer>) -> DeploymentLifecycleManager {
        DeploymentLifecycleManager::new(deployer, Duration::from_secs(1), Duration::from_secs(10))
    }

    #[tokio::test(start_paused = true)]
    async fn waits_until_all_replicas_are_ready() {
        let deployer = Arc::new(FakeDeployer::new().ready_after(3));
        let manager = manager(deployer.clone());
        let started = Instant::now();

        let handle = manager.create(&spec("writer")).await.unwrap();
        manager.wait_ready(&handle).await.unwrap();

        assert_eq!(Duration::from_secs(3), started.elapsed());
        assert_eq!(vec!["writer".to_string()], deployer.created());
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_is_not_ready() {
        let deployer = Arc::new(FakeDeployer::new().not_found_for(2));
        let manager = manager(deployer.clone());

        let handle = manager.create(&spec("writer")).await.unwrap();
        manager.wait_ready(&handle).await.unwrap();

        assert_eq!(3, deployer.polls("writer"));
    }

    #[tokio::test(start_paused = true)]
    async fn never_ready_times_out() {
        let deployer = Arc::new(FakeDeployer::new().never_ready("writer"));
        let manager = manager(deployer);

        let handle = manager.create(&spec("writer")).await.unwrap();
        let err = manager.wait_ready(&handle).await.unwrap_err();

        match err {
            BenchError::ReadinessTimeout {
                name,
                ready_replicas,
                desired_replicas,
                ..
            } => {
                assert_eq!("writer", name);
                assert_eq!(0, ready_replicas);
                assert_eq!(2, desired_replicas);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_failure_aborts_the_wait() {
        let deployer = Arc::new(FakeDeployer::new().ready_after(5).fail_get("writer"));
        let manager = manager(deployer.clone());
        let started = Instant::now();

        let handle = manager.create(&spec("writer")).await.unwrap();
        let err = manager.wait_ready(&handle).await.unwrap_err();

        assert!(matches!(err, BenchError::Deployment { .. }));
        assert_eq!(Duration::ZERO, started.elapsed());
    }

    #[tokio::test]
    async fn create_failure_names_the_workload() {
        let deployer = Arc::new(FakeDeployer::new().fail_create("writer"));
        let manager = manager(deployer.clone());

        let err = manager.create(&spec("writer")).await.unwrap_err();

        assert!(matches!(err, BenchError::Deployment { ref name, .. } if name == "writer"));
        assert!(deployer.created().is_empty());
    }
}
