use crate::error::BenchError;
use crate::executor::MetricQueryExecutor;
use logbench_core::prelude::{poll_until, PollError};
use logbench_instruments::prelude::PromDuration;
use parking_lot::Mutex;
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

/// The counters a latch can wait on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchMetric {
    DistributorBytesReceivedTotal,
}

impl LatchMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            LatchMetric::DistributorBytesReceivedTotal => "loki_distributor_bytes_received_total",
        }
    }

    /// How much the counter grew over `window`, summed across series.
    pub fn query(&self, window: PromDuration) -> String {
        let metric = self.as_str();
        format!("sum(max_over_time({metric}[{window}]) - min_over_time({metric}[{window}]))")
    }
}

impl Display for LatchMetric {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LatchMetric {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "loki_distributor_bytes_received_total" => Ok(LatchMetric::DistributorBytesReceivedTotal),
            other => Err(BenchError::UnsupportedMetric(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatchSpec {
    /// Name of the metric to watch. Must parse as a [LatchMetric].
    pub metric: String,
    pub threshold: f64,
    /// The range the growth of the metric is measured over.
    pub window: Duration,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

/// Blocks until a metric reaches a threshold.
pub struct LatchGate<'a> {
    executor: &'a MetricQueryExecutor,
}

impl<'a> LatchGate<'a> {
    pub fn new(executor: &'a MetricQueryExecutor) -> Self {
        Self { executor }
    }

    /// Poll the metric until it is at least `spec.threshold`, returning the value that satisfied
    /// the latch.
    ///
    /// A failed query counts as a miss and polling continues. An unsupported metric or a negative
    /// threshold fails before any query is made.
    pub async fn wait_until_greater_or_equal(&self, spec: &LatchSpec) -> Result<f64, BenchError> {
        let metric = spec.metric.parse::<LatchMetric>()?;
        if spec.threshold.is_nan() || spec.threshold < 0.0 {
            return Err(BenchError::configuration(format!(
                "latch threshold must be a non-negative number, got {}",
                spec.threshold
            )));
        }

        let query = metric.query(PromDuration::new(spec.window));
        let threshold = spec.threshold;
        let last_observed = Mutex::new(None::<f64>);

        log::info!("Waiting for {metric} to reach {threshold}");

        let executor = self.executor;
        let query = query.as_str();
        let observed = &last_observed;
        let result = poll_until(spec.poll_interval, spec.timeout, move || async move {
            match executor.execute(query).await {
                Ok(value) => {
                    log::debug!("Latch on {metric} observed {value}");
                    *observed.lock() = Some(value);
                    Ok::<_, Infallible>(value >= threshold)
                }
                Err(e) => {
                    log::warn!("Latch query failed, will retry: {e}");
                    Ok(false)
                }
            }
        })
        .await;

        let last_observed = *last_observed.lock();
        match result {
            Ok(attempts) => {
                let value = last_observed.unwrap_or(threshold);
                log::info!("Latch on {metric} released at {value} after {attempts} attempts");
                Ok(value)
            }
            Err(PollError::TimedOut { .. }) => Err(BenchError::LatchTimeout {
                metric: metric.to_string(),
                threshold,
                timeout: spec.timeout,
                last_observed,
            }),
            Err(PollError::Aborted(never)) => match never {},
        }
    }
}
