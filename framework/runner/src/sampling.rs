use crate::config::SampleSpec;
use crate::error::BenchError;
use crate::executor::MetricQueryExecutor;
use indicatif::ProgressBar;
use logbench_instruments::prelude::{Battery, MeasurementSink, RecordName, SampleRecord};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::time::Instant;

/// What sampling does when a query in a round fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryFailurePolicy {
    /// Stop sampling and return the first error. Values already recorded are kept.
    #[default]
    Abort,
    /// Log the failure, record nothing for that measurement and carry on.
    Skip,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleSummary {
    pub rounds: u32,
    pub recorded: usize,
    pub skipped: usize,
}

/// Evaluates a battery at fixed intervals and forwards each value to a sink.
pub struct SamplingEngine<'a> {
    executor: &'a MetricQueryExecutor,
    policy: QueryFailurePolicy,
    progress: ProgressBar,
}

impl<'a> SamplingEngine<'a> {
    pub fn new(executor: &'a MetricQueryExecutor) -> Self {
        Self {
            executor,
            policy: QueryFailurePolicy::default(),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_policy(mut self, policy: QueryFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Run `spec.total` rounds over `battery`, recording values named for `scenario`.
    ///
    /// Round `k` starts `k * spec.interval` after the call, so the first round waits one full
    /// interval and slow queries do not push later rounds back. The whole call must finish within
    /// [SampleSpec::deadline].
    pub async fn sample(
        &self,
        battery: &Battery,
        spec: &SampleSpec,
        scenario: &str,
        sink: &mut dyn MeasurementSink,
    ) -> Result<SampleSummary, BenchError> {
        let names = battery
            .iter()
            .map(|m| RecordName::new(m.annotation.as_str(), m.name.as_str(), scenario))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| BenchError::configuration(e.to_string()))?;

        let deadline = spec.deadline().ok_or_else(|| {
            BenchError::configuration(format!(
                "sampling {} rounds every {:?} does not fit in a deadline",
                spec.total, spec.interval
            ))
        })?;
        let summary = tokio::time::timeout(deadline, self.rounds(battery, &names, spec, sink))
            .await
            .map_err(|_| BenchError::SamplingDeadline(deadline))??;

        self.progress.finish_and_clear();
        log::info!(
            "Sampling finished after {} rounds with {} values recorded and {} skipped",
            summary.rounds,
            summary.recorded,
            summary.skipped
        );

        Ok(summary)
    }

    async fn rounds(
        &self,
        battery: &Battery,
        names: &[RecordName],
        spec: &SampleSpec,
        sink: &mut dyn MeasurementSink,
    ) -> Result<SampleSummary, BenchError> {
        let mut summary = SampleSummary::default();
        self.progress.set_length(u64::from(spec.total));

        let start = Instant::now();
        for round in 1..=spec.total {
            let due = spec
                .interval
                .checked_mul(round)
                .and_then(|offset| start.checked_add(offset))
                .ok_or_else(|| {
                    BenchError::configuration(format!(
                        "sampling round {round} every {:?} is out of range",
                        spec.interval
                    ))
                })?;
            tokio::time::sleep_until(due).await;
            log::debug!("Starting sampling round {round}/{}", spec.total);

            for (measurement, name) in battery.iter().zip(names) {
                match self.executor.execute(&measurement.query).await {
                    Ok(value) => {
                        sink.record(&SampleRecord {
                            name: name.clone(),
                            value,
                            unit: measurement.unit,
                            annotation: measurement.annotation,
                            round,
                            timestamp: SystemTime::now(),
                        });
                        summary.recorded += 1;
                    }
                    Err(e) => match self.policy {
                        QueryFailurePolicy::Abort => return Err(e.into()),
                        QueryFailurePolicy::Skip => {
                            log::warn!("Skipping {name} in round {round}: {e}");
                            summary.skipped += 1;
                        }
                    },
                }
            }

            summary.rounds = round;
            self.progress.inc(1);
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{BackendError, QueryValue};
    use crate::testing::ScriptedBackend;
    use logbench_instruments::prelude::{Annotation, InMemorySink, Measurement, Unit};
    use std::sync::Arc;
    use std::time::Duration;

    fn battery() -> Battery {
        [
            Measurement::new("rate", "q_rate", Unit::RequestsPerSecond, Annotation::Distributor),
            Measurement::new("latency", "q_latency", Unit::Milliseconds, Annotation::Ingester),
        ]
        .into_iter()
        .collect()
    }

    fn spec(total: u32) -> SampleSpec {
        SampleSpec {
            total,
            interval: Duration::from_secs(10),
            range: Duration::from_secs(300),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rounds_are_aligned_to_interval_boundaries() {
        let backend = Arc::new(
            ScriptedBackend::constant(QueryValue::Scalar(1.0)).with_delay(Duration::from_secs(3)),
        );
        let executor = MetricQueryExecutor::new(backend.clone(), Duration::from_secs(5));
        let mut sink = InMemorySink::quiet();
        let started = Instant::now();

        let summary = SamplingEngine::new(&executor)
            .sample(&battery(), &spec(3), "steady", &mut sink)
            .await
            .unwrap();

        assert_eq!(3, summary.rounds);
        assert_eq!(6, summary.recorded);

        let first_query_of_each_round = backend
            .calls()
            .iter()
            .step_by(2)
            .map(|c| c.at.duration_since(started))
            .collect::<Vec<_>>();
        assert_eq!(
            vec![
                Duration::from_secs(10),
                Duration::from_secs(20),
                Duration::from_secs(30)
            ],
            first_query_of_each_round
        );
    }

    #[tokio::test(start_paused = true)]
    async fn constant_measurement_recorded_once_per_round() {
        let backend = Arc::new(ScriptedBackend::constant(QueryValue::Scalar(42.0)));
        let executor = MetricQueryExecutor::new(backend.clone(), Duration::from_secs(5));
        let mut sink = InMemorySink::quiet();
        let battery: Battery = [Measurement::new(
            "answer",
            "vector(42)",
            Unit::RequestsPerSecond,
            Annotation::Querier,
        )]
        .into_iter()
        .collect();
        let spec = SampleSpec {
            total: 3,
            interval: Duration::from_secs(1),
            range: Duration::from_secs(300),
        };

        SamplingEngine::new(&executor)
            .sample(&battery, &spec, "constant", &mut sink)
            .await
            .unwrap();

        assert_eq!(
            vec![42.0, 42.0, 42.0],
            sink.records().iter().map(|r| r.value).collect::<Vec<_>>()
        );
        let calls = backend.calls();
        for pair in calls.windows(2) {
            assert!(pair[1].at.duration_since(pair[0].at) >= Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn records_are_named_and_ordered() {
        let backend = Arc::new(ScriptedBackend::constant(QueryValue::Scalar(2.0)));
        let executor = MetricQueryExecutor::new(backend, Duration::from_secs(5));
        let mut sink = InMemorySink::quiet();

        SamplingEngine::new(&executor)
            .sample(&battery(), &spec(2), "steady", &mut sink)
            .await
            .unwrap();

        let names = sink
            .records()
            .iter()
            .map(|r| (r.name.to_string(), r.round))
            .collect::<Vec<_>>();
        assert_eq!(
            vec![
                ("distributor - rate - steady".to_string(), 1),
                ("ingester - latency - steady".to_string(), 1),
                ("distributor - rate - steady".to_string(), 2),
                ("ingester - latency - steady".to_string(), 2),
            ],
            names
        );
    }

    #[tokio::test(start_paused = true)]
    async fn abort_keeps_values_recorded_before_the_failure() {
        let backend = Arc::new(ScriptedBackend::new(|query, _| {
            if query == "q_latency" {
                Err(BackendError::Transport("connection reset".to_string()))
            } else {
                Ok(QueryValue::Scalar(1.0))
            }
        }));
        let executor = MetricQueryExecutor::new(backend, Duration::from_secs(5));
        let mut sink = InMemorySink::quiet();

        let err = SamplingEngine::new(&executor)
            .sample(&battery(), &spec(3), "steady", &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, BenchError::QueryExecution(ref e) if e.query == "q_latency"));
        assert_eq!(1, sink.records().len());
    }

    #[tokio::test(start_paused = true)]
    async fn skip_policy_continues_past_failures() {
        let backend = Arc::new(ScriptedBackend::new(|query, _| {
            if query == "q_latency" {
                Ok(QueryValue::Other("matrix".to_string()))
            } else {
                Ok(QueryValue::Vector(vec![4.0]))
            }
        }));
        let executor = MetricQueryExecutor::new(backend, Duration::from_secs(5));
        let mut sink = InMemorySink::quiet();

        let summary = SamplingEngine::new(&executor)
            .with_policy(QueryFailurePolicy::Skip)
            .sample(&battery(), &spec(3), "steady", &mut sink)
            .await
            .unwrap();

        assert_eq!(
            SampleSummary {
                rounds: 3,
                recorded: 3,
                skipped: 3
            },
            summary
        );
        assert!(sink.records().iter().all(|r| r.value == 4.0));
    }

    #[tokio::test(start_paused = true)]
    async fn rounds_that_overrun_hit_the_deadline() {
        let backend = Arc::new(
            ScriptedBackend::constant(QueryValue::Scalar(1.0)).with_delay(Duration::from_secs(9)),
        );
        let executor = MetricQueryExecutor::new(backend, Duration::from_secs(30));
        let mut sink = InMemorySink::quiet();

        let err = SamplingEngine::new(&executor)
            .sample(&battery(), &spec(3), "steady", &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, BenchError::SamplingDeadline(d) if d == Duration::from_secs(40)));
    }

    #[tokio::test(start_paused = true)]
    async fn interval_too_long_for_a_deadline_is_rejected() {
        let backend = Arc::new(ScriptedBackend::constant(QueryValue::Scalar(1.0)));
        let executor = MetricQueryExecutor::new(backend.clone(), Duration::from_secs(5));
        let mut sink = InMemorySink::quiet();
        let spec = SampleSpec {
            total: 3,
            interval: Duration::MAX / 2,
            range: Duration::from_secs(300),
        };

        let err = SamplingEngine::new(&executor)
            .sample(&battery(), &spec, "steady", &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, BenchError::Configuration(_)));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_descriptions_with_the_separator_are_rejected() {
        let backend = Arc::new(ScriptedBackend::constant(QueryValue::Scalar(1.0)));
        let executor = MetricQueryExecutor::new(backend.clone(), Duration::from_secs(5));
        let mut sink = InMemorySink::quiet();

        let err = SamplingEngine::new(&executor)
            .sample(&battery(), &spec(1), "a - b", &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, BenchError::Configuration(_)));
        assert!(backend.calls().is_empty());
    }
}
