use crate::name::RecordName;
use crate::sink::{MeasurementSink, SampleRecord};
use anyhow::Context;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Writes one CSV file of `<unix seconds>,<value>` rows per record name.
///
/// Files are laid out as `<dir>/<scenario>/<component>-<metric>.csv`, with each path segment
/// reduced to characters that are safe in file names. Nothing is written until the sink is
/// finalized.
#[derive(Debug)]
pub struct CsvSink {
    dir: PathBuf,
    series: BTreeMap<RecordName, Vec<(u64, f64)>>,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            series: BTreeMap::new(),
        }
    }

    pub(crate) fn file_path(&self, name: &RecordName) -> PathBuf {
        csv_file_path(&self.dir, name)
    }
}

fn csv_file_path(dir: &Path, name: &RecordName) -> PathBuf {
    let file_stem = sanitize_file_name(&format!("{}-{}", name.component(), name.metric()));
    dir.join(sanitize_file_name(name.scenario()))
        .join(format!("{file_stem}.csv"))
}

fn sanitize_file_name(name: &str) -> String {
    let sanitized = name
        .trim()
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') => Some(c),
            c if c.is_whitespace() || c == '/' || c == '\\' => Some('-'),
            _ => None,
        })
        .collect::<String>();

    if sanitized.is_empty() {
        "unnamed".to_string()
    } else {
        sanitized
    }
}

impl MeasurementSink for CsvSink {
    fn record(&mut self, record: &SampleRecord) {
        let seconds = record
            .timestamp
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.series
            .entry(record.name.clone())
            .or_default()
            .push((seconds, record.value));
    }

    fn finalize(&mut self) -> anyhow::Result<()> {
        for (name, rows) in &self.series {
            let path = csv_file_path(&self.dir, name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }

            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            for (seconds, value) in rows {
                writer.write_record([seconds.to_string(), format!("{value:.6}")])?;
            }
            writer.flush()?;
        }

        log::info!(
            "Wrote {} CSV series to {}",
            self.series.len(),
            self.dir.display()
        );
        Ok(())
    }
}
