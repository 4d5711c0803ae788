//! Command-line interface

use clap::Parser;

/// Measure latency, download and upload speed once and push the results to
/// a Prometheus push gateway
#[derive(Parser, Debug, Clone)]
#[command(name = "speedtest-prometheus")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Push gateway address (`host:port` or URL)
    #[arg(long, env = "PROMETHEUS_HOST", value_name = "HOST")]
    pub prometheus_host: Option<String>,
}
