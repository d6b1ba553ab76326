use logbench_clients::prelude::{DockerDeployer, KubectlDeployer, PrometheusBackend};
use logbench_runner::prelude::{
    BenchConfig, Collaborators, Deployer, DeployerKind, LogBenchScenarioCli,
    ScenarioDefinitionBuilder,
};
use std::sync::Arc;

/// Connect to Prometheus and to the configured deployer.
///
/// The Prometheus URL comes from the config, which the `--prometheus-url` flag has already
/// overridden by the time this is called.
pub fn connect(config: &BenchConfig, cli: &LogBenchScenarioCli) -> anyhow::Result<Collaborators> {
    let backend = PrometheusBackend::new(&config.metrics.url, cli.prometheus_token.as_deref())?;
    log::debug!("Querying Prometheus at {}", backend.query_url());

    let deployer: Arc<dyn Deployer> = match config.deployer {
        DeployerKind::Kubernetes => Arc::new(KubectlDeployer::from_env()?),
        DeployerKind::Docker => Arc::new(DockerDeployer::from_env(config.network.clone())?),
    };
    log::debug!("Deploying workloads with {:?}", config.deployer);

    Ok(Collaborators {
        deployer,
        backend: Arc::new(backend),
    })
}

/// Start defining a Loki scenario, parsing the command line and wiring in [connect].
pub fn loki_scenario(name: &str) -> ScenarioDefinitionBuilder {
    ScenarioDefinitionBuilder::new_with_init(name).use_connect(connect)
}
