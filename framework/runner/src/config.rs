//! The YAML configuration that describes the service under test and the scenarios to run.

use crate::error::BenchError;
use crate::sampling::QueryFailurePolicy;
use anyhow::Context;
use logbench_instruments::prelude::{validate_scenario_description, Annotation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_LATCH_METRIC: &str = "loki_distributor_bytes_received_total";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BenchConfig {
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub deployer: DeployerKind,
    #[serde(default)]
    pub generator: Option<GeneratorConfig>,
    #[serde(default)]
    pub querier: Option<QuerierConfig>,
    /// Container network to attach workloads to. Only used by the docker deployer.
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub scenarios: BTreeMap<String, ScenarioConfig>,
}

impl BenchConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse configuration file {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Checks the settings shared by all scenarios. Scenario settings are checked when the
    /// scenario runs.
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.metrics.url.trim().is_empty() {
            return Err(BenchError::configuration("metrics.url must be set"));
        }
        if self.metrics.query_timeout.is_zero() {
            return Err(BenchError::configuration(
                "metrics.queryTimeout must be greater than zero",
            ));
        }
        self.timeouts.validate()
    }

    pub fn scenario(&self, name: &str) -> Result<&ScenarioConfig, BenchError> {
        self.scenarios.get(name).ok_or_else(|| {
            BenchError::configuration(format!("no scenario named '{name}' is configured"))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsConfig {
    pub url: String,
    #[serde(with = "humantime_serde", default = "default_query_timeout")]
    pub query_timeout: Duration,
    #[serde(default)]
    pub jobs: Jobs,
    /// Include container memory in resource usage batteries. Requires cAdvisor metrics.
    #[serde(default)]
    pub enable_cadvisor_metrics: bool,
}

/// The job label of each component, as scraped by Prometheus.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Jobs {
    pub distributor: Option<String>,
    pub ingester: Option<String>,
    pub querier: Option<String>,
    pub query_frontend: Option<String>,
    pub index_gateway: Option<String>,
}

impl Jobs {
    pub fn get(&self, component: Annotation) -> Result<&str, BenchError> {
        let job = match component {
            Annotation::Distributor => &self.distributor,
            Annotation::Ingester => &self.ingester,
            Annotation::Querier => &self.querier,
            Annotation::QueryFrontend => &self.query_frontend,
            Annotation::IndexGateway => &self.index_gateway,
            Annotation::Logql | Annotation::Generator => {
                return Err(BenchError::configuration(format!(
                    "'{component}' is not a service component with a job"
                )))
            }
        };

        job.as_deref().ok_or_else(|| {
            BenchError::configuration(format!("metrics.jobs has no job for '{component}'"))
        })
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeployerKind {
    #[default]
    Kubernetes,
    Docker,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorConfig {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub image: String,
    #[serde(default)]
    pub service_account: Option<String>,
    pub tenant: String,
    /// The push endpoint of the service under test
    pub push_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuerierConfig {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub image: String,
    #[serde(default)]
    pub service_account: Option<String>,
    pub tenant: String,
    /// The query endpoint of the service under test
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Timeouts {
    #[serde(with = "humantime_serde", default = "default_poll")]
    pub readiness_poll: Duration,
    #[serde(with = "humantime_serde", default = "default_readiness")]
    pub readiness: Duration,
    #[serde(with = "humantime_serde", default = "default_poll")]
    pub latch_poll: Duration,
    #[serde(with = "humantime_serde", default = "default_five_minutes")]
    pub latch: Duration,
    /// The range of the latch query
    #[serde(with = "humantime_serde", default = "default_five_minutes")]
    pub latch_window: Duration,
    /// How long a read-only scenario lets its generator run before deploying readers. Zero
    /// deploys the readers as soon as the generator is ready.
    #[serde(with = "humantime_serde", default = "default_five_minutes")]
    pub seed: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            readiness_poll: default_poll(),
            readiness: default_readiness(),
            latch_poll: default_poll(),
            latch: default_five_minutes(),
            latch_window: default_five_minutes(),
            seed: default_five_minutes(),
        }
    }
}

impl Timeouts {
    fn validate(&self) -> Result<(), BenchError> {
        for (name, value) in [
            ("timeouts.readinessPoll", self.readiness_poll),
            ("timeouts.readiness", self.readiness),
            ("timeouts.latchPoll", self.latch_poll),
            ("timeouts.latch", self.latch),
            ("timeouts.latchWindow", self.latch_window),
        ] {
            if value.is_zero() {
                return Err(BenchError::configuration(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        Ok(())
    }
}

/// Number of sampling rounds, the time between them and the range used in every query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SampleSpec {
    pub total: u32,
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    #[serde(with = "humantime_serde")]
    pub range: Duration,
}

impl SampleSpec {
    /// The latest point after sampling starts by which every round must have finished, or `None`
    /// if it does not fit in a [Duration].
    pub fn deadline(&self) -> Option<Duration> {
        self.interval.checked_mul(self.total.checked_add(1)?)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WriterSpec {
    pub replicas: u32,
    /// Extra generator flags, passed as `--<key>=<value>`.
    #[serde(default)]
    pub args: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReaderSpec {
    /// Replicas of each querier workload
    pub replicas: u32,
    #[serde(default)]
    pub args: BTreeMap<String, String>,
    /// One querier workload is deployed per entry, keyed by a short id.
    pub queries: BTreeMap<String, String>,
    /// Readers start once the latch metric reaches this value.
    #[serde(default)]
    pub start_threshold: f64,
    #[serde(default = "default_latch_metric")]
    pub latch_metric: String,
    /// Seeds data for read-only scenarios.
    #[serde(default)]
    pub generator: Option<WriterSpec>,
}

impl ReaderSpec {
    /// The generator that seeds data for a read-only configuration, one replica unless set.
    pub fn seed_generator(&self) -> WriterSpec {
        self.generator.clone().unwrap_or(WriterSpec {
            replicas: 1,
            args: BTreeMap::new(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioConfig {
    #[serde(default)]
    pub enabled: bool,
    pub description: String,
    #[serde(default)]
    pub writers: Option<WriterSpec>,
    #[serde(default)]
    pub readers: Option<ReaderSpec>,
    pub samples: SampleSpec,
    #[serde(default)]
    pub on_query_error: QueryFailurePolicy,
    /// Run the scenario once per entry, each overriding the settings above.
    #[serde(default)]
    pub configurations: Vec<ConfigurationOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationOverride {
    pub description: String,
    #[serde(default)]
    pub samples: Option<SampleSpec>,
    #[serde(default)]
    pub writers: Option<WriterSpec>,
    #[serde(default)]
    pub readers: Option<ReaderSpec>,
}

/// One fully resolved element of a scenario's configuration sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub description: String,
    pub samples: SampleSpec,
    pub writers: Option<WriterSpec>,
    pub readers: Option<ReaderSpec>,
    pub on_query_error: QueryFailurePolicy,
}

/// Which workloads a configuration deploys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioShape {
    WriteOnly,
    ReadOnly,
    Mixed,
}

impl ScenarioConfig {
    pub fn configurations(&self) -> Vec<Configuration> {
        let base = Configuration {
            description: self.description.clone(),
            samples: self.samples,
            writers: self.writers.clone(),
            readers: self.readers.clone(),
            on_query_error: self.on_query_error,
        };

        if self.configurations.is_empty() {
            return vec![base];
        }

        self.configurations
            .iter()
            .map(|o| Configuration {
                description: o.description.clone(),
                samples: o.samples.unwrap_or(base.samples),
                writers: o.writers.clone().or_else(|| base.writers.clone()),
                readers: o.readers.clone().or_else(|| base.readers.clone()),
                on_query_error: base.on_query_error,
            })
            .collect()
    }
}

impl Configuration {
    pub fn shape(&self) -> Result<ScenarioShape, BenchError> {
        match (&self.writers, &self.readers) {
            (Some(_), Some(_)) => Ok(ScenarioShape::Mixed),
            (Some(_), None) => Ok(ScenarioShape::WriteOnly),
            (None, Some(_)) => Ok(ScenarioShape::ReadOnly),
            (None, None) => Err(BenchError::configuration(format!(
                "configuration '{}' has neither writers nor readers",
                self.description
            ))),
        }
    }

    pub fn validate(&self) -> Result<(), BenchError> {
        validate_scenario_description(&self.description)
            .map_err(|e| BenchError::configuration(e.to_string()))?;

        if self.samples.total == 0 {
            return Err(BenchError::configuration("samples.total must be at least 1"));
        }
        if self.samples.interval.is_zero() {
            return Err(BenchError::configuration(
                "samples.interval must be greater than zero",
            ));
        }
        if self.samples.range.is_zero() {
            return Err(BenchError::configuration(
                "samples.range must be greater than zero",
            ));
        }
        if self.samples.deadline().is_none() {
            return Err(BenchError::configuration(format!(
                "samples.interval of {:?} over {} rounds is too long",
                self.samples.interval, self.samples.total
            )));
        }

        if let Some(readers) = &self.readers {
            if readers.queries.is_empty() {
                return Err(BenchError::configuration(
                    "readers.queries must name at least one query",
                ));
            }
            validate_query_ids(readers.queries.keys())?;
            if readers.start_threshold.is_nan() || readers.start_threshold < 0.0 {
                return Err(BenchError::configuration(format!(
                    "readers.startThreshold must be a non-negative number, got {}",
                    readers.start_threshold
                )));
            }
        }

        self.shape()?;

        Ok(())
    }
}

/// Query ids become part of workload names and label values, so once lowercased they must be
/// unique RFC 1123 labels.
fn validate_query_ids<'a>(ids: impl Iterator<Item = &'a String>) -> Result<(), BenchError> {
    let mut seen = BTreeMap::new();
    for id in ids {
        let lowercase = id.to_lowercase();
        if !is_dns_label(&lowercase) {
            return Err(BenchError::configuration(format!(
                "readers.queries id '{id}' must contain only letters, digits and '-', start and end \
                 with a letter or digit and be at most {MAX_QUERY_ID_LEN} characters"
            )));
        }
        if let Some(other) = seen.insert(lowercase, id) {
            return Err(BenchError::configuration(format!(
                "readers.queries ids '{other}' and '{id}' name the same workload"
            )));
        }
    }
    Ok(())
}

const MAX_QUERY_ID_LEN: usize = 63;

fn is_dns_label(value: &str) -> bool {
    let alphanumeric = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();

    !value.is_empty()
        && value.len() <= MAX_QUERY_ID_LEN
        && value.chars().all(|c| alphanumeric(c) || c == '-')
        && value.starts_with(alphanumeric)
        && value.ends_with(alphanumeric)
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_latch_metric() -> String {
    DEFAULT_LATCH_METRIC.to_string()
}

fn default_query_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_poll() -> Duration {
    Duration::from_secs(5)
}

fn default_readiness() -> Duration {
    Duration::from_secs(60)
}

fn default_five_minutes() -> Duration {
    Duration::from_secs(300)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CONFIG: &str = r#"
metrics:
  url: http://prometheus:9090
  jobs:
    distributor: distributor
    ingester: ingester
generator:
  name: logbench-generator
  image: example/generator:latest
  tenant: tenant-a
  pushUrl: http://distributor:3100/loki/api/v1/push
querier:
  name: logbench-querier
  namespace: bench
  image: example/querier:latest
  tenant: tenant-a
  url: http://query-frontend:3100
timeouts:
  readiness: 2m
scenarios:
  high_volume_reads:
    enabled: true
    description: high volume reads
    onQueryError: skip
    writers:
      replicas: 2
      args:
        logs-per-second: "1000"
    readers:
      replicas: 1
      startThreshold: 1000000
      queries:
        rate: sum(rate({job="x"}[1m]))
    samples:
      total: 3
      interval: 30s
      range: 1m
    configurations:
      - description: small
      - description: large
        samples:
          total: 5
          interval: 1m
          range: 5m
"#;

    #[test]
    fn parses_with_defaults() {
        let config = BenchConfig::from_yaml(CONFIG).unwrap();
        config.validate().unwrap();

        assert_eq!(DeployerKind::Kubernetes, config.deployer);
        assert_eq!(Duration::from_secs(10), config.metrics.query_timeout);
        assert_eq!(Duration::from_secs(120), config.timeouts.readiness);
        assert_eq!(Duration::from_secs(5), config.timeouts.latch_poll);
        assert_eq!(Duration::from_secs(300), config.timeouts.seed);
        assert_eq!("default", config.generator.as_ref().unwrap().namespace);

        let scenario = config.scenario("high_volume_reads").unwrap();
        assert_eq!(QueryFailurePolicy::Skip, scenario.on_query_error);
        let readers = scenario.readers.as_ref().unwrap();
        assert_eq!(DEFAULT_LATCH_METRIC, readers.latch_metric);
        assert_eq!(1_000_000.0, readers.start_threshold);
    }

    #[test]
    fn overrides_are_merged_onto_the_scenario() {
        let config = BenchConfig::from_yaml(CONFIG).unwrap();
        let configurations = config
            .scenario("high_volume_reads")
            .unwrap()
            .configurations();

        assert_eq!(2, configurations.len());
        assert_eq!("small", configurations[0].description);
        assert_eq!(3, configurations[0].samples.total);
        assert_eq!(5, configurations[1].samples.total);
        assert_eq!(Duration::from_secs(300), configurations[1].samples.range);
        assert_eq!(ScenarioShape::Mixed, configurations[1].shape().unwrap());
        assert_eq!(QueryFailurePolicy::Skip, configurations[1].on_query_error);
    }

    #[test]
    fn unknown_scenario_is_a_configuration_error() {
        let config = BenchConfig::from_yaml(CONFIG).unwrap();
        assert!(matches!(
            config.scenario("missing"),
            Err(BenchError::Configuration(_))
        ));
    }

    #[test]
    fn missing_job_is_a_configuration_error() {
        let config = BenchConfig::from_yaml(CONFIG).unwrap();
        assert_eq!("ingester", config.metrics.jobs.get(Annotation::Ingester).unwrap());
        assert!(matches!(
            config.metrics.jobs.get(Annotation::QueryFrontend),
            Err(BenchError::Configuration(_))
        ));
    }

    fn configuration() -> Configuration {
        Configuration {
            description: "reads".to_string(),
            samples: SampleSpec {
                total: 3,
                interval: Duration::from_secs(10),
                range: Duration::from_secs(60),
            },
            writers: None,
            readers: Some(ReaderSpec {
                replicas: 1,
                args: BTreeMap::new(),
                queries: BTreeMap::from([("a".to_string(), "q".to_string())]),
                start_threshold: 0.0,
                latch_metric: default_latch_metric(),
                generator: Some(WriterSpec::default()),
            }),
            on_query_error: QueryFailurePolicy::Abort,
        }
    }

    #[test]
    fn rejects_invalid_configurations() {
        let mut negative = configuration();
        negative.readers.as_mut().unwrap().start_threshold = -1.0;
        assert!(negative.validate().is_err());

        let mut no_rounds = configuration();
        no_rounds.samples.total = 0;
        assert!(no_rounds.validate().is_err());

        let mut separator = configuration();
        separator.description = "reads - heavy".to_string();
        assert!(separator.validate().is_err());

        let mut no_queries = configuration();
        no_queries.readers.as_mut().unwrap().queries.clear();
        assert!(no_queries.validate().is_err());

        let mut empty = configuration();
        empty.readers = None;
        assert!(matches!(
            empty.validate(),
            Err(BenchError::Configuration(_))
        ));

        configuration().validate().unwrap();
    }

    #[test]
    fn seed_generator_defaults_to_one_replica() {
        let mut unseeded = configuration();
        unseeded.readers.as_mut().unwrap().generator = None;
        unseeded.validate().unwrap();
        assert_eq!(1, unseeded.readers.unwrap().seed_generator().replicas);
    }

    #[test]
    fn sampling_deadline_allows_one_extra_interval() {
        let spec = configuration().samples;
        assert_eq!(Some(Duration::from_secs(40)), spec.deadline());
    }

    #[test]
    fn sampling_deadline_that_overflows_is_rejected() {
        let mut config = configuration();
        config.samples.interval = Duration::MAX / 2;
        assert_eq!(None, config.samples.deadline());
        assert!(matches!(
            config.validate(),
            Err(BenchError::Configuration(ref m)) if m.contains("too long")
        ));

        config.samples.total = u32::MAX;
        config.samples.interval = Duration::from_secs(1);
        config.validate().unwrap();
    }

    #[test]
    fn query_ids_must_name_distinct_workloads() {
        let mut clash = configuration();
        clash.readers.as_mut().unwrap().queries = BTreeMap::from([
            ("A".to_string(), "q".to_string()),
            ("a".to_string(), "q".to_string()),
        ]);
        let err = clash.validate().unwrap_err();
        assert!(err.to_string().contains("'A' and 'a'"), "{err}");

        let too_long = "x".repeat(64);
        for id in ["", "a_b", "has space", "-a", "a-", "a.b", too_long.as_str()] {
            let mut invalid = configuration();
            invalid.readers.as_mut().unwrap().queries =
                BTreeMap::from([(id.to_string(), "q".to_string())]);
            assert!(
                matches!(invalid.validate(), Err(BenchError::Configuration(_))),
                "{id:?} was accepted"
            );
        }

        let mut valid = configuration();
        valid.readers.as_mut().unwrap().queries = BTreeMap::from([
            ("Count".to_string(), "q".to_string()),
            ("filter-2".to_string(), "q".to_string()),
            ("x".repeat(63), "q".to_string()),
        ]);
        valid.validate().unwrap();
    }

    #[test]
    fn zero_timeouts() {
        for zeroed in [
            Timeouts {
                readiness: Duration::ZERO,
                ..Default::default()
            },
            Timeouts {
                latch: Duration::ZERO,
                ..Default::default()
            },
            Timeouts {
                latch_poll: Duration::ZERO,
                ..Default::default()
            },
        ] {
            assert!(matches!(
                zeroed.validate(),
                Err(BenchError::Configuration(ref m)) if m.contains("greater than zero")
            ));
        }

        Timeouts {
            seed: Duration::ZERO,
            ..Default::default()
        }
        .validate()
        .unwrap();
    }

    #[test]
    fn bundled_config_is_valid() {
        let config = BenchConfig::from_yaml(include_str!("../../../logbench.yaml")).unwrap();
        config.validate().unwrap();

        for (name, scenario) in &config.scenarios {
            for configuration in scenario.configurations() {
                configuration
                    .validate()
                    .unwrap_or_else(|e| panic!("{name}: {e}"));
            }
        }

        let sweep = config.scenario("ingestion_path").unwrap().configurations();
        assert_eq!(2, sweep.len());
        assert_eq!(Some(8), sweep[1].writers.as_ref().map(|w| w.replicas));
        assert_eq!(
            ScenarioShape::ReadOnly,
            config
                .scenario("query_path")
                .unwrap()
                .configurations()[0]
                .shape()
                .unwrap()
        );
        for mixed in ["high_volume_aggregate", "logs_based_dashboard"] {
            assert_eq!(
                ScenarioShape::Mixed,
                config.scenario(mixed).unwrap().configurations()[0]
                    .shape()
                    .unwrap()
            );
        }
    }
}
