//! Metric instruments and push gateway publishing
//!
//! The three instruments live in a [`MetricSet`] built once at startup and
//! handed to the [`MetricsPublisher`]; nothing is registered globally.

pub mod exposition;
pub mod instruments;
pub mod push;

pub use exposition::encode;
pub use instruments::{Gauge, Objective, Summary, SummarySnapshot};
pub use push::{MetricsPusher, PushGateway, PushGatewayClient, PushRequest};

use crate::context::RunContext;
use crate::error::Result;
use crate::models::Measurement;
use crate::telemetry::Telemetry;

/// Quantile objectives of the latency summary with their error tolerances
pub const LATENCY_OBJECTIVES: [(f64, f64); 3] = [(0.5, 0.05), (0.9, 0.01), (0.99, 0.001)];

/// Instruments pushed after every run
#[derive(Debug)]
pub struct MetricSet {
    latency: Summary,
    upload_speed: Gauge,
    download_speed: Gauge,
}

impl MetricSet {
    pub fn new() -> Result<Self> {
        Ok(Self {
            latency: Summary::new("latency", "Speed test latency.", &LATENCY_OBJECTIVES)?,
            upload_speed: Gauge::new("upload_speed", "Upload speed in bytes/second.")?,
            download_speed: Gauge::new("download_speed", "Download speed in bytes/second.")?,
        })
    }

    /// Latency summary, in microseconds
    pub fn latency(&self) -> &Summary {
        &self.latency
    }

    /// Upload rate gauge, in bytes/second
    pub fn upload_speed(&self) -> &Gauge {
        &self.upload_speed
    }

    /// Download rate gauge, in bytes/second
    pub fn download_speed(&self) -> &Gauge {
        &self.download_speed
    }

    /// Copy a measurement into the instruments
    pub fn record(&self, measurement: &Measurement) {
        self.latency.observe(measurement.latency_micros());
        self.upload_speed.set(measurement.upload_rate);
        self.download_speed.set(measurement.download_rate);
    }
}

/// Records measurements and pushes the whole set in a single call
pub struct MetricsPublisher<M> {
    metrics: MetricSet,
    pusher: M,
    job: String,
}

impl<M: MetricsPusher> MetricsPublisher<M> {
    /// Publisher grouping pushes under the `speedtest` job
    pub fn new(metrics: MetricSet, pusher: M) -> Self {
        Self::with_job(metrics, pusher, crate::JOB_NAME)
    }

    pub fn with_job(metrics: MetricSet, pusher: M, job: &str) -> Self {
        Self {
            metrics,
            pusher,
            job: job.to_string(),
        }
    }

    pub fn metrics(&self) -> &MetricSet {
        &self.metrics
    }

    pub fn pusher(&self) -> &M {
        &self.pusher
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    /// Record `measurement` and push all instruments to `gateway`
    pub async fn publish(
        &self,
        ctx: &RunContext,
        telemetry: &Telemetry,
        gateway: &PushGateway,
        measurement: &Measurement,
    ) -> Result<()> {
        let ctx = ctx.child(telemetry, "push_metrics");
        let result = self.push_measurement(gateway, measurement).await;
        ctx.finish(&result);

        if result.is_ok() {
            ctx.logger()
                .info("metrics pushed")
                .field("gateway", gateway.to_string())
                .field("job", &self.job)
                .log();
        }
        result
    }

    async fn push_measurement(&self, gateway: &PushGateway, measurement: &Measurement) -> Result<()> {
        let url = gateway.push_url(&self.job)?;
        self.metrics.record(measurement);
        let body = encode(&self.metrics);

        self.pusher
            .push(PushRequest {
                url,
                job: self.job.clone(),
                body,
            })
            .await
    }
}
