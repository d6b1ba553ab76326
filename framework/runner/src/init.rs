use crate::cli::LogBenchScenarioCli;
use clap::Parser;

/// Initialise the CLI and logging for the benchmark runner.
pub fn init() -> LogBenchScenarioCli {
    env_logger::init();

    LogBenchScenarioCli::parse()
}
