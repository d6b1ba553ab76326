use crate::cli::LogBenchScenarioCli;
use crate::config::{BenchConfig, Jobs};
use crate::context::Collaborators;
use crate::error::BenchError;
use logbench_instruments::prelude::{Annotation, Battery, PromDuration};

/// What a battery builder knows about the run it is building for.
#[derive(Debug, Clone, Copy)]
pub struct BatteryContext<'a> {
    pub jobs: &'a Jobs,
    /// The range every query in the battery uses.
    pub range: PromDuration,
    /// Name of the generator workload, used to select its pods.
    pub generator: &'a str,
    /// Whether container memory metrics are available.
    pub cadvisor: bool,
}

impl<'a> BatteryContext<'a> {
    /// The job label of a component, or a configuration error if none is configured.
    pub fn job(&self, component: Annotation) -> Result<&'a str, BenchError> {
        self.jobs.get(component)
    }
}

pub type BatteryFn = fn(&BatteryContext) -> Result<Battery, BenchError>;

pub type ConnectFn = fn(&BenchConfig, &LogBenchScenarioCli) -> anyhow::Result<Collaborators>;

/// The builder for a scenario definition.
///
/// This must be used at the start of a scenario binary to define the scenario that you want to run.
pub struct ScenarioDefinitionBuilder {
    /// The name of the scenario, which must match a key under `scenarios` in the configuration.
    ///
    /// Recommended value is `env!("CARGO_PKG_NAME")`.
    name: String,
    cli: LogBenchScenarioCli,
    /// Builds the measurements sampled in each round.
    battery_fn: Option<BatteryFn>,
    /// Creates the deployer and metrics backend once the configuration is loaded.
    connect_fn: Option<ConnectFn>,
}

pub(crate) struct ScenarioDefinition {
    pub name: String,
    pub cli: LogBenchScenarioCli,
    pub battery_fn: BatteryFn,
    pub connect_fn: ConnectFn,
}

impl ScenarioDefinitionBuilder {
    pub fn new(name: &str, cli: LogBenchScenarioCli) -> Self {
        Self {
            name: name.to_string(),
            cli,
            battery_fn: None,
            connect_fn: None,
        }
    }

    /// Initialise logging and parse the command line, then create the builder.
    pub fn new_with_init(name: &str) -> Self {
        Self::new(name, crate::init::init())
    }

    pub fn use_battery(mut self, battery_fn: BatteryFn) -> Self {
        self.battery_fn = Some(battery_fn);
        self
    }

    pub fn use_connect(mut self, connect_fn: ConnectFn) -> Self {
        self.connect_fn = Some(connect_fn);
        self
    }

    pub(crate) fn build(self) -> anyhow::Result<ScenarioDefinition> {
        let battery_fn = self.battery_fn.ok_or_else(|| {
            anyhow::anyhow!("Scenario {} does not define a battery", self.name)
        })?;
        let connect_fn = self.connect_fn.ok_or_else(|| {
            anyhow::anyhow!("Scenario {} does not define how to connect", self.name)
        })?;

        Ok(ScenarioDefinition {
            name: self.name,
            cli: self.cli,
            battery_fn,
            connect_fn,
        })
    }
}
