use crate::deployment::DeployerError;
use crate::executor::QueryExecutionError;
use crate::scenario::Phase;
use logbench_core::prelude::ShutdownSignalError;
use std::time::Duration;

/// Errors raised by the orchestration and sampling steps of a scenario.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("deployer failed for workload '{name}': {source}")]
    Deployment {
        name: String,
        #[source]
        source: DeployerError,
    },
    #[error("workload '{name}' had {ready_replicas}/{desired_replicas} ready replicas after {timeout:?}")]
    ReadinessTimeout {
        name: String,
        timeout: Duration,
        ready_replicas: u32,
        desired_replicas: u32,
    },
    #[error("{metric} did not reach {threshold} within {timeout:?} (last observed {last_observed:?})")]
    LatchTimeout {
        metric: String,
        threshold: f64,
        timeout: Duration,
        last_observed: Option<f64>,
    },
    #[error("unsupported latch metric '{0}'")]
    UnsupportedMetric(String),
    #[error(transparent)]
    QueryExecution(#[from] QueryExecutionError),
    #[error("sampling did not finish within {0:?}")]
    SamplingDeadline(Duration),
    #[error(transparent)]
    Shutdown(#[from] ShutdownSignalError),
}

impl BenchError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        BenchError::Configuration(message.into())
    }
}

/// A scenario configuration stopped before completing. Identifies the phase that failed.
#[derive(Debug, thiserror::Error)]
#[error("scenario '{scenario}' failed while {phase} for configuration '{configuration}': {source}")]
pub struct ScenarioError {
    pub scenario: String,
    pub configuration: String,
    pub phase: Phase,
    #[source]
    pub source: BenchError,
}
