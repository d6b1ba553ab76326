mod csv_sink;
mod in_memory_sink;
mod influx_file_sink;

use crate::measurement::{Annotation, Unit};
use crate::name::RecordName;
use std::time::SystemTime;

pub use csv_sink::CsvSink;
pub use in_memory_sink::InMemorySink;
pub use influx_file_sink::InfluxFileSink;

/// One sampled value, as handed to a [MeasurementSink].
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    pub name: RecordName,
    pub value: f64,
    pub unit: Unit,
    pub annotation: Annotation,
    /// 1-based sampling round that produced the value.
    pub round: u32,
    pub timestamp: SystemTime,
}

/// Receives sampled values. Records are never read back by the sampling engine.
pub trait MeasurementSink: Send {
    fn record(&mut self, record: &SampleRecord);

    /// Called once after the last record. Sinks that buffer should write out here.
    fn finalize(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Forwards every record to each of its sinks, in the order they were added.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn MeasurementSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: impl MeasurementSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl MeasurementSink for FanoutSink {
    fn record(&mut self, record: &SampleRecord) {
        for sink in &mut self.sinks {
            sink.record(record);
        }
    }

    /// Finalizes every sink even if an earlier one fails, then reports the first failure.
    fn finalize(&mut self) -> anyhow::Result<()> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.finalize() {
                log::error!("Failed to finalize measurement sink: {e:?}");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_record(
    component: &str,
    metric: &str,
    scenario: &str,
    value: f64,
    round: u32,
) -> SampleRecord {
    SampleRecord {
        name: RecordName::new(component, metric, scenario).unwrap(),
        value,
        unit: Unit::Milliseconds,
        annotation: Annotation::Querier,
        round,
        timestamp: SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000 + round as u64),
    }
}
