use crate::config::BenchConfig;
use crate::context::BenchContext;
use crate::definition::{ScenarioDefinition, ScenarioDefinitionBuilder};
use crate::scenario::{ConfigurationOutcome, ConfigurationReport, ScenarioRunner};
use crate::shutdown::start_shutdown_listener;
use anyhow::Context;
use logbench_instruments::prelude::{
    CsvSink, FanoutSink, InMemorySink, InfluxFileSink, MeasurementSink,
};
use logbench_summary_model::{append_run_summary, RunOutcome, RunSummary};

const RUN_SUMMARY_FILE: &str = "run_summary.jsonl";

/// Environment variables recorded in run summaries. The Prometheus token is never recorded.
const RECORDED_ENV: [&str; 3] = ["LOGBENCH_CONFIG", "PROMETHEUS_URL", "REPORT_DIR"];

/// Run every configuration of the scenario, returning how many completed.
pub fn run(definition: ScenarioDefinitionBuilder) -> anyhow::Result<usize> {
    let definition = definition.build()?;

    log::info!("Running scenario: {}", definition.name);

    let mut config = BenchConfig::load(&definition.cli.config)?;
    if let Some(url) = &definition.cli.prometheus_url {
        config.metrics.url = url.clone();
    }
    config.validate()?;
    let scenario_config = config.scenario(&definition.name)?.clone();

    let collaborators = (definition.connect_fn)(&config, &definition.cli)
        .context("Failed to connect to the deployer and metrics backend")?;

    let run_id = definition
        .cli
        .run_id
        .clone()
        .unwrap_or_else(|| nanoid::nanoid!());
    log::info!("Run id: {run_id}");

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let shutdown_handle = start_shutdown_listener(&runtime)?;
    let ctx = BenchContext::new(config, collaborators, run_id, shutdown_handle)
        .with_progress(!definition.cli.no_progress);

    let mut sink = build_sink(&definition, ctx.run_id())?;

    let mut runner = ScenarioRunner::new(&ctx, definition.name.as_str(), definition.battery_fn);
    let result = runtime.block_on(runner.run(&scenario_config, &mut sink));

    // Keep whatever was sampled before a failure.
    if let Err(e) = sink.finalize() {
        log::error!("Failed to write reports: {e:?}");
    }

    let reports = runner.into_reports();
    if let Some(dir) = &definition.cli.report_dir {
        let summaries: Vec<RunSummary> = if scenario_config.enabled {
            reports
                .iter()
                .map(|r| summarize(&definition.name, ctx.run_id(), r))
                .collect()
        } else {
            vec![disabled_summary(&definition.name, ctx.run_id(), &scenario_config.description)]
        };

        for summary in summaries {
            append_run_summary(&summary, dir.join(RUN_SUMMARY_FILE))
                .context("Failed to write run summary")?;
        }
    }

    let completed = result?;
    log::info!(
        "Scenario {} finished {completed} configurations",
        definition.name
    );

    Ok(completed)
}

fn build_sink(definition: &ScenarioDefinition, run_id: &str) -> anyhow::Result<FanoutSink> {
    let mut sink = FanoutSink::new().with_sink(InMemorySink::new());

    if let Some(dir) = &definition.cli.report_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create report directory {}", dir.display()))?;

        sink = sink
            .with_sink(CsvSink::new(dir))
            .with_sink(InfluxFileSink::new(
                &dir.join("influx"),
                &definition.name,
                run_id,
            )?);
    }

    Ok(sink)
}

fn new_summary(scenario: &str, run_id: &str, configuration: &str, started_at: i64) -> RunSummary {
    let mut summary = RunSummary::new(
        run_id.to_string(),
        scenario.to_string(),
        configuration.to_string(),
        started_at,
        env!("CARGO_PKG_VERSION").to_string(),
    );
    for key in RECORDED_ENV {
        if let Ok(value) = std::env::var(key) {
            summary.add_env(key.to_string(), value);
        }
    }
    summary
}

fn summarize(scenario: &str, run_id: &str, report: &ConfigurationReport) -> RunSummary {
    let mut summary = new_summary(
        scenario,
        run_id,
        &report.description,
        report.started_at.timestamp(),
    );

    let samples = &report.configuration.samples;
    summary.set_sampling(
        samples.total,
        samples.interval.as_secs(),
        samples.range.as_secs(),
    );

    match &report.outcome {
        ConfigurationOutcome::Completed(sampled) => {
            summary.set_counts(sampled.recorded, sampled.skipped);
        }
        ConfigurationOutcome::Failed { phase, error } => {
            summary.set_outcome(RunOutcome::Failed {
                phase: phase.to_string(),
                error: error.clone(),
            });
        }
    }

    summary
}

fn disabled_summary(scenario: &str, run_id: &str, description: &str) -> RunSummary {
    let mut summary = new_summary(scenario, run_id, description, chrono::Utc::now().timestamp());
    summary.set_outcome(RunOutcome::Disabled);
    summary
}
