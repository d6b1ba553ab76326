use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sha3::Digest;
use std::collections::HashMap;
use std::io::{BufRead, Read, Write};
use std::path::PathBuf;

/// How a scenario configuration ended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RunOutcome {
    /// Every sampling round ran and every workload was torn down.
    Completed,
    /// The scenario is switched off in the configuration file.
    Disabled,
    /// The run stopped in `phase`. Samples recorded before the failure are kept.
    Failed { phase: String, error: String },
}

/// Summary of one scenario configuration run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// The unique run id
    ///
    /// Chosen by the runner. Shared by every configuration of a scenario run.
    pub run_id: String,
    /// The name of the scenario that was run
    pub scenario_name: String,
    /// The description of the configuration, which is also the last part of every record name
    pub configuration: String,
    /// The time the configuration started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    /// The number of sampling rounds configured
    pub sample_total: u32,
    /// The time between sampling rounds, in seconds
    pub sample_interval_s: u64,
    /// The range used in every measurement query, in seconds
    pub sample_range_s: u64,
    /// The number of values forwarded to the sinks
    pub records: usize,
    /// The number of failed queries that were skipped rather than aborting the run
    pub skipped: usize,
    pub outcome: RunOutcome,
    /// Environment variables set for the run
    ///
    /// This won't capture all environment variables. Just the ones that the runner is aware of.
    pub env: HashMap<String, String>,
    /// The version of the harness that produced this summary
    pub logbench_version: String,
}

impl RunSummary {
    /// Create a new run summary, initially marked as completed with no records
    pub fn new(
        run_id: String,
        scenario_name: String,
        configuration: String,
        started_at: i64,
        logbench_version: String,
    ) -> Self {
        Self {
            run_id,
            scenario_name,
            configuration,
            started_at,
            sample_total: 0,
            sample_interval_s: 0,
            sample_range_s: 0,
            records: 0,
            skipped: 0,
            outcome: RunOutcome::Completed,
            env: HashMap::with_capacity(0),
            logbench_version,
        }
    }

    /// Set the sampling configuration
    pub fn set_sampling(&mut self, total: u32, interval_s: u64, range_s: u64) {
        self.sample_total = total;
        self.sample_interval_s = interval_s;
        self.sample_range_s = range_s;
    }

    /// Set the number of recorded and skipped values
    pub fn set_counts(&mut self, records: usize, skipped: usize) {
        self.records = records;
        self.skipped = skipped;
    }

    pub fn set_outcome(&mut self, outcome: RunOutcome) {
        self.outcome = outcome;
    }

    /// Add an environment variable
    pub fn add_env(&mut self, key: String, value: String) {
        self.env.insert(key, value);
    }

    /// Compute a fingerprint for this run summary
    ///
    /// The fingerprint is intended to identify the configuration used to run the scenario, so
    /// that runs with the same settings can be compared. It uses the
    ///     - Scenario name
    ///     - Configuration description
    ///     - Sampling settings
    ///     - Selected environment variables
    ///     - Harness version
    ///
    /// The fingerprint is computed using [sha3::Sha3_256].
    pub fn fingerprint(&self) -> String {
        let mut hasher = sha3::Sha3_256::new();
        Digest::update(&mut hasher, self.scenario_name.as_bytes());
        Digest::update(&mut hasher, self.configuration.as_bytes());
        Digest::update(&mut hasher, self.sample_total.to_le_bytes());
        Digest::update(&mut hasher, self.sample_interval_s.to_le_bytes());
        Digest::update(&mut hasher, self.sample_range_s.to_le_bytes());
        self.env
            .iter()
            .sorted_by_key(|(k, _)| k.to_owned())
            .for_each(|(k, v)| {
                Digest::update(&mut hasher, k.as_bytes());
                Digest::update(&mut hasher, v.as_bytes());
            });
        Digest::update(&mut hasher, self.logbench_version.as_bytes());

        format!("{:x}", hasher.finalize())
    }
}

/// Append the run summary to a file
///
/// The summary will be serialized to JSON and output as a single line followed by a newline. The
/// recommended file extension is `.jsonl`.
pub fn append_run_summary(run_summary: &RunSummary, path: PathBuf) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    store_run_summary(run_summary, &mut file)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Serialize the run summary to a writer
pub fn store_run_summary<W: Write>(run_summary: &RunSummary, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer(writer, run_summary)?;
    Ok(())
}

/// Load a run summary from a reader
pub fn load_run_summary<R: Read>(reader: R) -> anyhow::Result<RunSummary> {
    let reader = std::io::BufReader::new(reader);
    let run_summary: RunSummary = serde_json::from_reader(reader)?;
    Ok(run_summary)
}

/// Load run summaries from a file
///
/// The file should contain one JSON object per line. This is the format produced by
/// [append_run_summary].
pub fn load_summary_runs(path: PathBuf) -> anyhow::Result<Vec<RunSummary>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut runs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let run: RunSummary = serde_json::from_str(&line)?;
        runs.push(run);
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(run_id: &str) -> RunSummary {
        let mut summary = RunSummary::new(
            run_id.to_string(),
            "ingestion_path".to_string(),
            "10GB per day".to_string(),
            1_700_000_000,
            "0.1.0".to_string(),
        );
        summary.set_sampling(3, 60, 300);
        summary
    }

    #[test]
    fn fingerprint_ignores_run_specific_fields() {
        let mut first = summary("a");
        let mut second = summary("b");
        first.set_counts(10, 0);
        second.set_outcome(RunOutcome::Failed {
            phase: "sampling".to_string(),
            error: "boom".to_string(),
        });

        assert_eq!(first.fingerprint(), second.fingerprint());

        second.set_sampling(4, 60, 300);
        assert_ne!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn append_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_summary.jsonl");

        let mut failed = summary("b");
        failed.set_outcome(RunOutcome::Failed {
            phase: "waiting for the latch".to_string(),
            error: "latch timed out".to_string(),
        });

        append_run_summary(&summary("a"), path.clone()).unwrap();
        append_run_summary(&failed, path.clone()).unwrap();

        let runs = load_summary_runs(path).unwrap();
        assert_eq!(vec![summary("a"), failed], runs);
    }
}
