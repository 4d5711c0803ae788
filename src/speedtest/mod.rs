//! Speed test measurement runner
//!
//! The runner drives a [`SpeedTestProvider`] through server discovery and the
//! ping, download and upload probes, strictly in that order. A failing step
//! aborts the remaining ones and surfaces an error naming the step.

pub mod client;

pub use client::{ProbePlan, SpeedtestNetClient};

use crate::context::RunContext;
use crate::error::{AppError, Result};
use crate::models::{LatencyStats, Measurement, Server};
use crate::telemetry::Telemetry;
use crate::types::ProbeStage;
use async_trait::async_trait;
use std::future::Future;

/// Source of measurement servers and the probes run against them
#[async_trait]
pub trait SpeedTestProvider: Send + Sync {
    /// Fetch the candidate server list
    async fn fetch_servers(&self) -> Result<Vec<Server>>;

    /// Pick usable servers from the candidate list, best first
    fn select_servers(&self, servers: Vec<Server>) -> Result<Vec<Server>> {
        select_servers(servers)
    }

    /// Round-trip latency probe
    async fn ping(&self, server: &Server) -> Result<LatencyStats>;

    /// Download throughput probe, in bytes/second
    async fn download(&self, server: &Server) -> Result<f64>;

    /// Upload throughput probe, in bytes/second
    async fn upload(&self, server: &Server) -> Result<f64>;
}

/// Drop servers without a usable URL and order the rest by distance
pub fn select_servers(servers: Vec<Server>) -> Result<Vec<Server>> {
    if servers.is_empty() {
        return Err(AppError::server_not_found("empty server list"));
    }

    let mut usable: Vec<Server> = servers
        .into_iter()
        .filter(|s| s.upload_url().is_ok())
        .collect();
    if usable.is_empty() {
        return Err(AppError::server_not_found("no server with a usable URL"));
    }

    usable.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    Ok(usable)
}

/// Run a full speed test against the best server the provider offers
pub async fn run_speed_test<P>(ctx: &RunContext, telemetry: &Telemetry, provider: &P) -> Result<Measurement>
where
    P: SpeedTestProvider + ?Sized,
{
    let ctx = ctx.child(telemetry, "run_speed_test");
    let result = measure(&ctx, telemetry, provider).await;
    ctx.finish(&result);
    result
}

async fn measure<P>(ctx: &RunContext, telemetry: &Telemetry, provider: &P) -> Result<Measurement>
where
    P: SpeedTestProvider + ?Sized,
{
    let servers = provider.fetch_servers().await.map_err(|e| match e {
        AppError::ServerList(_) => e,
        other => AppError::server_list(other.to_string()),
    })?;

    let target = provider
        .select_servers(servers)?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::server_not_found("no server selected"))?;

    ctx.logger()
        .info("start speed test")
        .field("server", target.summary())
        .log();

    let latency_stats = probe(ctx, telemetry, ProbeStage::Ping, provider.ping(&target)).await?;
    let download_rate = probe(ctx, telemetry, ProbeStage::Download, provider.download(&target)).await?;
    let upload_rate = probe(ctx, telemetry, ProbeStage::Upload, provider.upload(&target)).await?;

    let measurement = Measurement {
        server: target.summary(),
        latency: latency_stats.mean,
        latency_stats,
        download_rate,
        upload_rate,
    };

    ctx.logger()
        .info(&measurement.describe())
        .field("server", &measurement.server)
        .field("latency_us", measurement.latency_micros())
        .field("jitter_us", measurement.latency_stats.jitter.as_micros() as f64)
        .field("download_bytes_per_second", measurement.download_rate)
        .field("upload_bytes_per_second", measurement.upload_rate)
        .log();

    Ok(measurement)
}

/// Run one probe inside its own span, tagging any error with the stage
async fn probe<T, F>(ctx: &RunContext, telemetry: &Telemetry, stage: ProbeStage, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let ctx = ctx.child(telemetry, stage.span_name());
    let result = fut.await.map_err(|e| {
        if e.probe_stage() == Some(stage) {
            e
        } else {
            AppError::probe(stage, e.to_string())
        }
    });
    ctx.finish(&result);
    result
}
