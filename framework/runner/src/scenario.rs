use crate::config::{BenchConfig, Configuration, ScenarioConfig, ScenarioShape};
use crate::context::BenchContext;
use crate::definition::{BatteryContext, BatteryFn};
use crate::deployment::{DeploymentSpec, WorkloadHandle};
use crate::error::{BenchError, ScenarioError};
use crate::latch::{LatchGate, LatchMetric, LatchSpec};
use crate::progress::sampling_progress;
use crate::sampling::{SampleSummary, SamplingEngine};
use crate::workload::{generator_spec, querier_specs};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use logbench_core::prelude::ShutdownSignalError;
use logbench_instruments::prelude::{Battery, MeasurementSink, PromDuration};
use std::future::Future;

/// The steps a scenario configuration moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum Phase {
    #[display("idle")]
    Idle,
    #[display("disabled")]
    Disabled,
    #[display("validating the configuration")]
    ValidatingConfig,
    #[display("deploying the writer")]
    DeployingWriter,
    #[display("waiting for the writer to be ready")]
    AwaitingWriterReady,
    #[display("waiting for the latch")]
    AwaitingLatch,
    #[display("seeding load")]
    SeedingLoad,
    #[display("tearing down the writer")]
    TearingDownWriter,
    #[display("deploying readers")]
    DeployingReaders,
    #[display("waiting for readers to be ready")]
    AwaitingReadersReady,
    #[display("sampling")]
    Sampling,
    #[display("tearing down readers")]
    TearingDownReaders,
    #[display("done")]
    Done,
    #[display("failed")]
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationOutcome {
    Completed(SampleSummary),
    Failed { phase: Phase, error: String },
}

/// The result of running one configuration of a scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationReport {
    pub description: String,
    pub started_at: DateTime<Utc>,
    pub configuration: Configuration,
    pub outcome: ConfigurationOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Writer,
    Reader,
}

/// Everything a configuration will deploy, resolved before anything is deployed.
enum Plan {
    WriteOnly {
        writer: DeploymentSpec,
    },
    Mixed {
        writer: DeploymentSpec,
        readers: Vec<DeploymentSpec>,
        latch: LatchSpec,
    },
    ReadOnly {
        seed: DeploymentSpec,
        readers: Vec<DeploymentSpec>,
    },
}

impl Plan {
    fn resolve(config: &BenchConfig, configuration: &Configuration) -> Result<Self, BenchError> {
        let generator = || {
            config.generator.as_ref().ok_or_else(|| {
                BenchError::configuration("a generator must be configured to deploy writers")
            })
        };
        let querier = || {
            config.querier.as_ref().ok_or_else(|| {
                BenchError::configuration("a querier must be configured to deploy readers")
            })
        };

        let plan = match (
            configuration.shape()?,
            &configuration.writers,
            &configuration.readers,
        ) {
            (ScenarioShape::WriteOnly, Some(writers), _) => Plan::WriteOnly {
                writer: generator_spec(writers, generator()?),
            },
            (ScenarioShape::Mixed, Some(writers), Some(readers)) => {
                let metric = readers.latch_metric.parse::<LatchMetric>()?;
                Plan::Mixed {
                    writer: generator_spec(writers, generator()?),
                    readers: querier_specs(readers, querier()?),
                    latch: LatchSpec {
                        metric: metric.to_string(),
                        threshold: readers.start_threshold,
                        window: config.timeouts.latch_window,
                        poll_interval: config.timeouts.latch_poll,
                        timeout: config.timeouts.latch,
                    },
                }
            }
            (ScenarioShape::ReadOnly, _, Some(readers)) => Plan::ReadOnly {
                seed: generator_spec(&readers.seed_generator(), generator()?),
                readers: querier_specs(readers, querier()?),
            },
            _ => {
                return Err(BenchError::configuration(format!(
                    "configuration '{}' does not match its shape",
                    configuration.description
                )))
            }
        };

        Ok(plan)
    }
}

/// Runs each configuration of a scenario through deployment, gating, sampling and teardown.
///
/// Every workload created for a configuration is deleted exactly once before the configuration
/// finishes, whether it succeeds or not.
pub struct ScenarioRunner<'a> {
    ctx: &'a BenchContext,
    scenario: String,
    battery_fn: BatteryFn,
    phase: Phase,
    history: Vec<Phase>,
    live: Vec<(Role, WorkloadHandle)>,
    reports: Vec<ConfigurationReport>,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(ctx: &'a BenchContext, scenario: impl Into<String>, battery_fn: BatteryFn) -> Self {
        Self {
            ctx,
            scenario: scenario.into(),
            battery_fn,
            phase: Phase::Idle,
            history: Vec::new(),
            live: Vec::new(),
            reports: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Every phase entered so far, across all configurations.
    pub fn history(&self) -> &[Phase] {
        &self.history
    }

    pub fn reports(&self) -> &[ConfigurationReport] {
        &self.reports
    }

    pub fn into_reports(self) -> Vec<ConfigurationReport> {
        self.reports
    }

    /// Run every configuration of the scenario in order, stopping at the first failure.
    ///
    /// Returns how many configurations completed. A disabled scenario completes none.
    pub async fn run(
        &mut self,
        config: &ScenarioConfig,
        sink: &mut dyn MeasurementSink,
    ) -> Result<usize, ScenarioError> {
        if !config.enabled {
            log::info!("Scenario {} is disabled, skipping", self.scenario);
            self.enter(Phase::Disabled);
            return Ok(0);
        }

        let configurations = config.configurations();
        let total = configurations.len();
        for (index, configuration) in configurations.into_iter().enumerate() {
            log::info!(
                "Running configuration {}/{total} of scenario {}: {}",
                index + 1,
                self.scenario,
                configuration.description
            );
            self.run_configuration(configuration, sink).await?;
        }

        Ok(total)
    }

    async fn run_configuration(
        &mut self,
        configuration: Configuration,
        sink: &mut dyn MeasurementSink,
    ) -> Result<SampleSummary, ScenarioError> {
        let started_at = Utc::now();

        let result = self.drive(&configuration, sink).await;
        let failed_phase = self.phase;
        self.clean_up().await;

        let description = configuration.description.clone();
        match result {
            Ok(summary) => {
                self.enter(Phase::Done);
                let completed = self.ctx.mark_configuration_completed();
                log::info!(
                    "Configuration '{description}' of scenario {} completed ({completed} so far)",
                    self.scenario
                );
                self.reports.push(ConfigurationReport {
                    description,
                    started_at,
                    configuration,
                    outcome: ConfigurationOutcome::Completed(summary),
                });
                Ok(summary)
            }
            Err(source) => {
                self.enter(Phase::Failed);
                let error = ScenarioError {
                    scenario: self.scenario.clone(),
                    configuration: description.clone(),
                    phase: failed_phase,
                    source,
                };
                log::error!("{error}");
                self.reports.push(ConfigurationReport {
                    description,
                    started_at,
                    configuration,
                    outcome: ConfigurationOutcome::Failed {
                        phase: failed_phase,
                        error: error.source.to_string(),
                    },
                });
                Err(error)
            }
        }
    }

    async fn drive(
        &mut self,
        configuration: &Configuration,
        sink: &mut dyn MeasurementSink,
    ) -> Result<SampleSummary, BenchError> {
        let ctx = self.ctx;

        self.enter(Phase::ValidatingConfig);
        configuration.validate()?;
        let plan = Plan::resolve(ctx.config(), configuration)?;
        let battery = (self.battery_fn)(&BatteryContext {
            jobs: &ctx.config().metrics.jobs,
            range: PromDuration::new(configuration.samples.range),
            generator: ctx
                .config()
                .generator
                .as_ref()
                .map(|g| g.name.as_str())
                .unwrap_or_default(),
            cadvisor: ctx.config().metrics.enable_cadvisor_metrics,
        })?;
        if battery.is_empty() {
            return Err(BenchError::configuration(format!(
                "scenario {} has an empty battery",
                self.scenario
            )));
        }

        match plan {
            Plan::WriteOnly { writer } => {
                self.deploy_writer(&writer).await?;
                let summary = self.sample(&battery, configuration, sink).await?;
                self.tear_down(Phase::TearingDownWriter, Role::Writer).await?;
                Ok(summary)
            }
            Plan::Mixed {
                writer,
                readers,
                latch,
            } => {
                self.deploy_writer(&writer).await?;

                self.enter(Phase::AwaitingLatch);
                guarded(
                    ctx,
                    LatchGate::new(ctx.executor()).wait_until_greater_or_equal(&latch),
                )
                .await?;

                self.tear_down(Phase::TearingDownWriter, Role::Writer).await?;
                self.deploy_readers(&readers).await?;
                let summary = self.sample(&battery, configuration, sink).await?;
                self.tear_down(Phase::TearingDownReaders, Role::Reader).await?;
                Ok(summary)
            }
            Plan::ReadOnly { seed, readers } => {
                self.deploy_writer(&seed).await?;

                self.enter(Phase::SeedingLoad);
                let seed_period = ctx.config().timeouts.seed;
                log::info!("Letting the generator seed data for {seed_period:?}");
                guarded(ctx, async {
                    tokio::time::sleep(seed_period).await;
                    Ok(())
                })
                .await?;

                self.deploy_readers(&readers).await?;
                let summary = self.sample(&battery, configuration, sink).await?;
                self.tear_down(Phase::TearingDownReaders, Role::Reader).await?;
                self.tear_down(Phase::TearingDownWriter, Role::Writer).await?;
                Ok(summary)
            }
        }
    }

    async fn deploy_writer(&mut self, spec: &DeploymentSpec) -> Result<(), BenchError> {
        let ctx = self.ctx;
        ensure_running(ctx)?;

        self.enter(Phase::DeployingWriter);
        let handle = ctx.deployments().create(spec).await?;
        self.live.push((Role::Writer, handle.clone()));

        self.enter(Phase::AwaitingWriterReady);
        guarded(ctx, ctx.deployments().wait_ready(&handle)).await
    }

    /// Create every reader, then wait for all of them to be ready.
    ///
    /// All readers are given the chance to finish before the first failure is returned.
    async fn deploy_readers(&mut self, specs: &[DeploymentSpec]) -> Result<(), BenchError> {
        let ctx = self.ctx;
        ensure_running(ctx)?;

        self.enter(Phase::DeployingReaders);
        let created = join_all(specs.iter().map(move |spec| ctx.deployments().create(spec))).await;

        let mut first_error = None;
        let mut handles = Vec::with_capacity(created.len());
        for result in created {
            match result {
                Ok(handle) => {
                    self.live.push((Role::Reader, handle.clone()));
                    handles.push(handle);
                }
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(e) => log::warn!("Another reader also failed to deploy: {e}"),
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        self.enter(Phase::AwaitingReadersReady);
        let ready = guarded(ctx, async {
            join_all(handles.iter().map(|h| ctx.deployments().wait_ready(h)))
                .await
                .into_iter()
                .collect::<Result<Vec<_>, _>>()
        })
        .await?;
        log::info!("All {} readers are ready", ready.len());

        Ok(())
    }

    async fn sample(
        &mut self,
        battery: &Battery,
        configuration: &Configuration,
        sink: &mut dyn MeasurementSink,
    ) -> Result<SampleSummary, BenchError> {
        let ctx = self.ctx;
        ensure_running(ctx)?;

        self.enter(Phase::Sampling);
        let engine = SamplingEngine::new(ctx.executor())
            .with_policy(configuration.on_query_error)
            .with_progress(sampling_progress(
                configuration.samples.total,
                ctx.show_progress(),
            ));

        guarded(
            ctx,
            engine.sample(
                battery,
                &configuration.samples,
                &configuration.description,
                sink,
            ),
        )
        .await
    }

    /// Delete every live workload with `role`. Each is removed from the live set before its
    /// delete is attempted, so it is never deleted twice.
    async fn tear_down(&mut self, phase: Phase, role: Role) -> Result<(), BenchError> {
        self.enter(phase);

        let (handles, rest): (Vec<_>, Vec<_>) =
            self.live.drain(..).partition(|(r, _)| *r == role);
        self.live = rest;

        let mut first_error = None;
        for (_, handle) in handles {
            match self.ctx.deployments().delete(handle).await {
                Ok(()) => {}
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(e) => log::warn!("Failed to delete workload: {e}"),
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Best effort removal of anything a failed configuration left running, readers first.
    async fn clean_up(&mut self) {
        if self.live.is_empty() {
            return;
        }

        log::info!(
            "Cleaning up {} workloads left by scenario {}",
            self.live.len(),
            self.scenario
        );
        for (phase, role) in [
            (Phase::TearingDownReaders, Role::Reader),
            (Phase::TearingDownWriter, Role::Writer),
        ] {
            if self.live.iter().any(|(r, _)| *r == role) {
                if let Err(e) = self.tear_down(phase, role).await {
                    log::warn!("Failed to clean up after scenario {}: {e}", self.scenario);
                }
            }
        }
    }

    fn enter(&mut self, phase: Phase) {
        log::info!("Scenario {}: {phase}", self.scenario);
        self.phase = phase;
        self.history.push(phase);
    }
}

fn ensure_running(ctx: &BenchContext) -> Result<(), BenchError> {
    if ctx.shutdown_handle().is_shutdown() {
        return Err(ShutdownSignalError::default().into());
    }
    Ok(())
}

/// Race `work` against the shutdown signal. A shutdown always wins a tie.
async fn guarded<T>(
    ctx: &BenchContext,
    work: impl Future<Output = Result<T, BenchError>>,
) -> Result<T, BenchError> {
    let mut listener = ctx.shutdown_handle().new_listener();

    tokio::select! {
        biased;
        _ = listener.wait_for_shutdown() => Err(ShutdownSignalError::default().into()),
        result = work => result,
    }
}
