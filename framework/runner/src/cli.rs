use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(about, long_about = None)]
pub struct LogBenchScenarioCli {
    /// Path to the benchmark configuration file
    #[clap(short, long, env = "LOGBENCH_CONFIG", default_value = "logbench.yaml")]
    pub config: PathBuf,

    /// Override the Prometheus URL from the configuration file
    #[clap(long, env = "PROMETHEUS_URL")]
    pub prometheus_url: Option<String>,

    /// Bearer token sent with every Prometheus query
    #[clap(long, env = "PROMETHEUS_TOKEN", hide_env_values = true)]
    pub prometheus_token: Option<String>,

    /// Directory to write CSV, InfluxDB line protocol and run summary reports to.
    ///
    /// Nothing is written to disk if this is not set, only a summary table is printed.
    #[clap(long, env = "REPORT_DIR")]
    pub report_dir: Option<PathBuf>,

    /// Identifies this run in reports. A random id is generated if not set.
    #[clap(long)]
    pub run_id: Option<String>,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,
}
