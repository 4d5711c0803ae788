//! speedtest.net provider over HTTP
//!
//! Servers are listed by the speedtest.net JS API. Each server exposes
//! `latency.txt`, `random{N}x{N}.jpg` images and an upload script next to
//! its upload URL; the probes below use only those endpoints.

use super::SpeedTestProvider;
use crate::error::{AppError, ErrorContext, Result};
use crate::models::measurement::byte_rate;
use crate::models::{LatencyStats, Server};
use crate::types::ProbeStage;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use std::time::{Duration, Instant};
use url::Url;

/// Candidate server list endpoint
pub const SERVER_LIST_URL: &str =
    "https://www.speedtest.net/api/js/servers?engine=js&limit=10&https_functional=true";

/// How much traffic each probe generates
#[derive(Debug, Clone, PartialEq)]
pub struct ProbePlan {
    /// Number of `latency.txt` round trips
    pub ping_count: usize,
    /// Edge lengths of the `random{N}x{N}.jpg` images to download
    pub download_sizes: Vec<u32>,
    /// Upload payload sizes in bytes
    pub upload_sizes: Vec<usize>,
}

impl Default for ProbePlan {
    fn default() -> Self {
        Self {
            ping_count: 10,
            download_sizes: vec![350, 500, 750, 1000, 1500, 2000],
            upload_sizes: [100, 300, 500, 800, 1000, 1500]
                .iter()
                .map(|kb| kb * 1000)
                .collect(),
        }
    }
}

/// HTTP client implementing the speedtest.net probes
#[derive(Debug, Clone)]
pub struct SpeedtestNetClient {
    client: Client,
    server_list_url: Url,
    plan: ProbePlan,
}

impl SpeedtestNetClient {
    /// Client against the public server list with the default probe plan
    pub fn new() -> Result<Self> {
        let server_list_url = Url::parse(SERVER_LIST_URL)?;
        Self::with_config(server_list_url, ProbePlan::default())
    }

    pub fn with_config(server_list_url: Url, plan: ProbePlan) -> Result<Self> {
        if plan.ping_count == 0 || plan.download_sizes.is_empty() || plan.upload_sizes.is_empty() {
            return Err(AppError::config("probe plan must run at least one request per probe"));
        }

        let client = Client::builder()
            .user_agent(format!("{}/{}", crate::PKG_NAME, crate::VERSION))
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            server_list_url,
            plan,
        })
    }

    pub fn plan(&self) -> &ProbePlan {
        &self.plan
    }

    async fn get_checked(&self, url: Url) -> std::result::Result<Response, reqwest::Error> {
        self.client.get(url).send().await?.error_for_status()
    }
}

/// Upload payload in the form the upload script expects
fn upload_payload(size: usize) -> Vec<u8> {
    const PREFIX: &[u8] = b"content1=";
    const FILL: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    let mut body = Vec::with_capacity(size.max(PREFIX.len()));
    body.extend_from_slice(PREFIX);
    while body.len() < size {
        let remaining = size - body.len();
        body.extend_from_slice(&FILL[..remaining.min(FILL.len())]);
    }
    body
}

#[async_trait]
impl SpeedTestProvider for SpeedtestNetClient {
    async fn fetch_servers(&self) -> Result<Vec<Server>> {
        let response = self
            .get_checked(self.server_list_url.clone())
            .await
            .with_context(AppError::server_list)?;

        response
            .json::<Vec<Server>>()
            .await
            .with_context(|message| AppError::server_list(format!("invalid server list: {}", message)))
    }

    async fn ping(&self, server: &Server) -> Result<LatencyStats> {
        let url = server.endpoint("latency.txt").probe_context(ProbeStage::Ping)?;

        let mut samples = Vec::with_capacity(self.plan.ping_count);
        for _ in 0..self.plan.ping_count {
            let start = Instant::now();
            let response = self
                .get_checked(url.clone())
                .await
                .probe_context(ProbeStage::Ping)?;
            response.bytes().await.probe_context(ProbeStage::Ping)?;
            samples.push(start.elapsed());
        }

        LatencyStats::from_samples(&samples)
            .ok_or_else(|| AppError::probe(ProbeStage::Ping, "no latency samples"))
    }

    async fn download(&self, server: &Server) -> Result<f64> {
        let mut total_bytes: u64 = 0;
        let mut elapsed = Duration::ZERO;

        for size in &self.plan.download_sizes {
            let url = server
                .endpoint(&format!("random{}x{}.jpg", size, size))
                .probe_context(ProbeStage::Download)?;

            let start = Instant::now();
            let mut response = self
                .get_checked(url)
                .await
                .probe_context(ProbeStage::Download)?;
            while let Some(chunk) = response.chunk().await.probe_context(ProbeStage::Download)? {
                total_bytes += chunk.len() as u64;
            }
            elapsed += start.elapsed();
        }

        Ok(byte_rate(total_bytes, elapsed))
    }

    async fn upload(&self, server: &Server) -> Result<f64> {
        let url = server.upload_url().probe_context(ProbeStage::Upload)?;
        let mut total_bytes: u64 = 0;
        let mut elapsed = Duration::ZERO;

        for size in &self.plan.upload_sizes {
            let payload = upload_payload(*size);
            let sent = payload.len() as u64;

            let start = Instant::now();
            let response = self
                .client
                .post(url.clone())
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(payload)
                .send()
                .await
                .and_then(Response::error_for_status)
                .probe_context(ProbeStage::Upload)?;
            response.bytes().await.probe_context(ProbeStage::Upload)?;
            elapsed += start.elapsed();
            total_bytes += sent;
        }

        Ok(byte_rate(total_bytes, elapsed))
    }
}
