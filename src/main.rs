//! speedtest-prometheus - one-shot speed test pushed to a Prometheus push gateway

use clap::Parser;
use speedtest_prometheus::{app::App, cli::Cli, config::EnvManager, context::RunContext, logging::Logger, SERVICE_NAME};
use std::process;

#[tokio::main]
async fn main() {
    // Variables from `.env` must be visible before clap reads the environment
    let env_result = EnvManager::load_env_file();
    let cli = Cli::parse();

    let ctx = RunContext::new(Logger::stdout(SERVICE_NAME));

    let result = match env_result {
        Ok(_) => App::new(cli).run(&ctx).await.map(|_| ()),
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        ctx.logger().error(e.summary()).error_info(&e).log();
        process::exit(e.exit_code());
    }
}
