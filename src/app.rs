//! Main application orchestration and execution

use crate::{
    cli::Cli,
    config::Config,
    context::RunContext,
    error::Result,
    metrics::{MetricSet, MetricsPublisher, MetricsPusher, PushGatewayClient},
    models::Measurement,
    speedtest::{run_speed_test, SpeedTestProvider, SpeedtestNetClient},
    telemetry::{init_tracer, Telemetry},
    types::TracingMode,
};

/// Name of the span wrapping a whole run
pub const ROOT_SPAN: &str = "speedtest";

/// Main application struct wiring the production collaborators
pub struct App {
    cli: Cli,
}

impl App {
    /// Create a new application instance with CLI configuration
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run one speed test against speedtest.net and push to the configured gateway
    pub async fn run(self, ctx: &RunContext) -> Result<Measurement> {
        let provider = SpeedtestNetClient::new()?;
        let publisher = MetricsPublisher::new(MetricSet::new()?, PushGatewayClient::new()?);

        run(
            ctx,
            self.cli.prometheus_host.as_deref(),
            |mode| init_tracer(crate::SERVICE_NAME, mode),
            &provider,
            &publisher,
        )
        .await
    }
}

/// One complete job: resolve configuration, start tracing, measure, push,
/// then flush tracing exactly once whatever the outcome
///
/// Nothing is measured or pushed, and tracing is never started, when the
/// configuration does not resolve.
pub async fn run<B, P, M>(
    ctx: &RunContext,
    host: Option<&str>,
    bootstrap: B,
    provider: &P,
    publisher: &MetricsPublisher<M>,
) -> Result<Measurement>
where
    B: FnOnce(TracingMode) -> Result<Telemetry>,
    P: SpeedTestProvider + ?Sized,
    M: MetricsPusher,
{
    let config = Config::resolve(host)?;
    let mut telemetry = bootstrap(config.tracing)?;

    let root = ctx.child(&telemetry, ROOT_SPAN);
    let result = measure_and_publish(&root, &telemetry, &config, provider, publisher).await;
    root.finish(&result);

    if let Err(e) = telemetry.shutdown() {
        ctx.logger()
            .error("opentelemetry shutdown")
            .error_info(&e)
            .log();
    }

    result
}

async fn measure_and_publish<P, M>(
    ctx: &RunContext,
    telemetry: &Telemetry,
    config: &Config,
    provider: &P,
    publisher: &MetricsPublisher<M>,
) -> Result<Measurement>
where
    P: SpeedTestProvider + ?Sized,
    M: MetricsPusher,
{
    let measurement = run_speed_test(ctx, telemetry, provider).await?;
    publisher
        .publish(ctx, telemetry, &config.gateway, &measurement)
        .await?;
    Ok(measurement)
}
