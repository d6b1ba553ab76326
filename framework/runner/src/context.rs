use crate::config::BenchConfig;
use crate::deployment::{Deployer, DeploymentLifecycleManager};
use crate::executor::{MetricBackend, MetricQueryExecutor};
use logbench_core::prelude::ShutdownHandle;
use parking_lot::Mutex;
use std::sync::Arc;

/// The external systems a run talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub deployer: Arc<dyn Deployer>,
    pub backend: Arc<dyn MetricBackend>,
}

/// State shared by every phase of a run, constructed once and passed by reference.
pub struct BenchContext {
    config: BenchConfig,
    run_id: String,
    executor: MetricQueryExecutor,
    deployments: DeploymentLifecycleManager,
    shutdown_handle: ShutdownHandle,
    show_progress: bool,
    completed_configurations: Mutex<usize>,
}

impl BenchContext {
    pub fn new(
        config: BenchConfig,
        collaborators: Collaborators,
        run_id: impl Into<String>,
        shutdown_handle: ShutdownHandle,
    ) -> Self {
        let executor =
            MetricQueryExecutor::new(collaborators.backend, config.metrics.query_timeout);
        let deployments = DeploymentLifecycleManager::new(
            collaborators.deployer,
            config.timeouts.readiness_poll,
            config.timeouts.readiness,
        );

        Self {
            config,
            run_id: run_id.into(),
            executor,
            deployments,
            shutdown_handle,
            show_progress: false,
            completed_configurations: Mutex::new(0),
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn executor(&self) -> &MetricQueryExecutor {
        &self.executor
    }

    pub fn deployments(&self) -> &DeploymentLifecycleManager {
        &self.deployments
    }

    pub fn shutdown_handle(&self) -> &ShutdownHandle {
        &self.shutdown_handle
    }

    pub fn show_progress(&self) -> bool {
        self.show_progress
    }

    /// Count a configuration as completed, returning the new total.
    pub fn mark_configuration_completed(&self) -> usize {
        let mut completed = self.completed_configurations.lock();
        *completed += 1;
        *completed
    }

    pub fn completed_configurations(&self) -> usize {
        *self.completed_configurations.lock()
    }
}
