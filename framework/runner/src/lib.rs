mod cli;
mod config;
mod context;
mod definition;
mod deployment;
mod error;
mod executor;
mod init;
mod latch;
mod progress;
mod run;
mod sampling;
mod scenario;
mod shutdown;
mod types;
mod workload;

#[cfg(any(test, feature = "test_utils"))]
pub mod testing;

pub mod prelude {
    pub use crate::cli::LogBenchScenarioCli;
    pub use crate::config::{
        BenchConfig, Configuration, ConfigurationOverride, DeployerKind, GeneratorConfig, Jobs,
        MetricsConfig, QuerierConfig, ReaderSpec, SampleSpec, ScenarioConfig, ScenarioShape,
        Timeouts, WriterSpec, DEFAULT_LATCH_METRIC,
    };
    pub use crate::context::{BenchContext, Collaborators};
    pub use crate::definition::{BatteryContext, BatteryFn, ConnectFn, ScenarioDefinitionBuilder};
    pub use crate::deployment::{
        Deployer, DeployerError, DeploymentLifecycleManager, DeploymentSpec, WorkloadHandle,
        WorkloadStatus,
    };
    pub use crate::error::{BenchError, ScenarioError};
    pub use crate::executor::{
        BackendError, MetricBackend, MetricQueryExecutor, QueryExecutionError, QueryFailure,
        QueryValue,
    };
    pub use crate::init::init;
    pub use crate::latch::{LatchGate, LatchMetric, LatchSpec};
    pub use crate::run::run;
    pub use crate::sampling::{QueryFailurePolicy, SampleSummary, SamplingEngine};
    pub use crate::scenario::{ConfigurationOutcome, ConfigurationReport, Phase, ScenarioRunner};
    pub use crate::types::LogBenchResult;
    pub use crate::workload::{generator_spec, querier_specs, GENERATOR_APP_LABEL, QUERIER_APP_LABEL};
}
