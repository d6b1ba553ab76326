use crate::sink::{MeasurementSink, SampleRecord};
use anyhow::Context;
use influxdb::{InfluxDbWriteable, Query, Timestamp, WriteQuery};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

const MEASUREMENT_NAME: &str = "lb.sample";

/// Write samples to disk in the InfluxDB line protocol format, one file per scenario run.
/// The files can then be sent to InfluxDB by Telegraf.
pub struct InfluxFileSink {
    writer: BufWriter<File>,
    path: PathBuf,
    run_id: String,
    written: usize,
}

impl InfluxFileSink {
    pub fn new(dir: &Path, scenario_name: &str, run_id: &str) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create metrics directory {}", dir.display()))?;

        let path = dir.join(format!("{scenario_name}-{run_id}.influx"));
        let file = File::options()
            .create_new(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to create metrics file {}", path.display()))?;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
            run_id: run_id.to_string(),
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_query(&mut self, query: WriteQuery) -> anyhow::Result<()> {
        let line = query.build()?.get();
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

fn to_query(record: &SampleRecord, run_id: &str) -> WriteQuery {
    let nanos = record
        .timestamp
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    Timestamp::Nanoseconds(nanos)
        .into_query(MEASUREMENT_NAME)
        .add_field("value", record.value)
        .add_field("round", i64::from(record.round))
        .add_tag("component", record.name.component().to_string())
        .add_tag("metric", record.name.metric().to_string())
        .add_tag("scenario", record.name.scenario().to_string())
        .add_tag("unit", record.unit.to_string())
        .add_tag("annotation", record.annotation.to_string())
        .add_tag("run_id", run_id.to_string())
}

impl MeasurementSink for InfluxFileSink {
    fn record(&mut self, record: &SampleRecord) {
        if !record.value.is_finite() {
            // Line protocol has no representation for NaN or infinities.
            log::debug!("Not writing non-finite value for {}", record.name);
            return;
        }

        let query = to_query(record, &self.run_id);
        match self.write_query(query) {
            Ok(()) => self.written += 1,
            Err(e) => log::warn!("Failed to write sample to {}: {e:?}", self.path.display()),
        }
    }

    fn finalize(&mut self) -> anyhow::Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush {}", self.path.display()))?;
        log::debug!(
            "Wrote {} samples to {}",
            self.written,
            self.path.display()
        );
        Ok(())
    }
}
