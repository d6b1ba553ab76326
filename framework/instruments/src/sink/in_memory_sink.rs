mod summary_table;

use crate::sink::in_memory_sink::summary_table::SummaryRow;
use crate::sink::{MeasurementSink, SampleRecord};
use std::collections::BTreeMap;
use tabled::settings::Style;
use tabled::Table;

/// Keeps every record in memory and prints a summary table of them when finalized.
///
/// Useful while developing scenarios, and as the reference sink in tests.
#[derive(Debug)]
pub struct InMemorySink {
    records: Vec<SampleRecord>,
    print_summary: bool,
}

impl Default for InMemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySink {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            print_summary: true,
        }
    }

    /// A sink that only collects, for use in tests.
    pub fn quiet() -> Self {
        Self {
            records: Vec::new(),
            print_summary: false,
        }
    }

    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    pub(crate) fn summary_rows(&self) -> Vec<SummaryRow> {
        self.records
            .iter()
            .fold(BTreeMap::<String, Vec<&SampleRecord>>::new(), |mut acc, record| {
                acc.entry(record.name.to_string()).or_default().push(record);
                acc
            })
            .into_iter()
            .map(|(name, records)| {
                let values = records.iter().map(|r| r.value).collect::<Vec<_>>();
                SummaryRow {
                    name,
                    unit: records[0].unit.to_string(),
                    samples: values.len(),
                    mean: values.iter().sum::<f64>() / values.len() as f64,
                    min: values.iter().copied().fold(f64::INFINITY, f64::min),
                    max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                }
            })
            .collect()
    }

    fn print_summary_of_samples(&self) {
        if self.records.is_empty() {
            println!("\nNo samples were recorded");
            return;
        }

        println!("\nSummary of samples");
        let mut table = Table::new(self.summary_rows());
        table.with(Style::modern());

        println!("{table}");
    }
}

impl MeasurementSink for InMemorySink {
    fn record(&mut self, record: &SampleRecord) {
        self.records.push(record.clone());
    }

    fn finalize(&mut self) -> anyhow::Result<()> {
        if self.print_summary {
            self.print_summary_of_samples();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::sample_record;

    #[test]
    fn summarises_by_record_name() {
        let mut sink = InMemorySink::quiet();
        sink.record(&sample_record("querier", "latency", "reads", 10.0, 1));
        sink.record(&sample_record("ingester", "latency", "reads", 4.0, 1));
        sink.record(&sample_record("querier", "latency", "reads", 30.0, 2));

        let rows = sink.summary_rows();
        assert_eq!(2, rows.len());

        // BTreeMap ordering puts ingester first
        assert_eq!("ingester - latency - reads", rows[0].name);
        assert_eq!(1, rows[0].samples);

        assert_eq!(2, rows[1].samples);
        assert_eq!(20.0, rows[1].mean);
        assert_eq!(10.0, rows[1].min);
        assert_eq!(30.0, rows[1].max);
        assert_eq!("ms", rows[1].unit);
    }
}
