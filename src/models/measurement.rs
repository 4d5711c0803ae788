//! Speed test servers and measurement results

use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

/// One candidate measurement server as listed by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    /// Provider-assigned server identifier
    pub id: String,

    /// City or site name
    #[serde(default)]
    pub name: String,

    /// Country the server is located in
    #[serde(default)]
    pub country: String,

    /// Organisation hosting the server
    #[serde(default)]
    pub sponsor: String,

    /// `host:port` of the server
    #[serde(default)]
    pub host: String,

    /// Upload endpoint; other endpoints live next to it
    pub url: String,

    /// Distance from the client in kilometres
    #[serde(default)]
    pub distance: f64,
}

impl Server {
    /// Resolve an endpoint file (e.g. `latency.txt`) relative to the upload URL
    pub fn endpoint(&self, file: &str) -> Result<Url> {
        let upload = self.upload_url()?;
        upload
            .join(file)
            .map_err(|e| AppError::parse(format!("Invalid endpoint '{}' for server {}: {}", file, self.id, e)))
    }

    /// Parsed upload URL, rejecting anything that is not http(s)
    pub fn upload_url(&self) -> Result<Url> {
        let url = Url::parse(&self.url)?;
        match url.scheme() {
            "http" | "https" if url.host_str().is_some() => Ok(url),
            scheme => Err(AppError::parse(format!(
                "Unsupported server URL '{}' (scheme '{}')",
                self.url, scheme
            ))),
        }
    }

    /// Condensed description used in logs and results
    pub fn summary(&self) -> ServerSummary {
        ServerSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            sponsor: self.sponsor.clone(),
            country: self.country.clone(),
            distance_km: self.distance,
        }
    }
}

/// Identity of the server a measurement was taken against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSummary {
    pub id: String,
    pub name: String,
    pub sponsor: String,
    pub country: String,
    pub distance_km: f64,
}

impl fmt::Display for ServerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {}) [{:.2}km]", self.sponsor, self.name, self.country, self.distance_km)
    }
}

/// Round-trip statistics collected by the ping probe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    /// Mean round-trip time
    pub mean: Duration,

    /// Fastest round trip
    pub min: Duration,

    /// Slowest round trip
    pub max: Duration,

    /// Standard deviation of the round trips
    pub jitter: Duration,

    /// Number of round trips measured
    pub samples: usize,
}

impl LatencyStats {
    /// Calculate statistics from individual round-trip times
    pub fn from_samples(samples: &[Duration]) -> Option<Self> {
        let count = samples.len();
        if count == 0 {
            return None;
        }

        let total_nanos: u128 = samples.iter().map(Duration::as_nanos).sum();
        let mean = Duration::from_nanos((total_nanos / count as u128) as u64);
        let min = samples.iter().copied().min().unwrap_or_default();
        let max = samples.iter().copied().max().unwrap_or_default();

        let mean_secs = mean.as_secs_f64();
        let variance = if count > 1 {
            samples
                .iter()
                .map(|s| (s.as_secs_f64() - mean_secs).powi(2))
                .sum::<f64>()
                / count as f64
        } else {
            0.0
        };

        Some(Self {
            mean,
            min,
            max,
            jitter: Duration::from_secs_f64(variance.sqrt()),
            samples: count,
        })
    }
}

/// Result of one full speed test run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Server the probes ran against
    pub server: ServerSummary,

    /// Mean round-trip latency
    pub latency: Duration,

    /// Ping probe details
    pub latency_stats: LatencyStats,

    /// Download throughput in bytes per second
    pub download_rate: f64,

    /// Upload throughput in bytes per second
    pub upload_rate: f64,
}

impl Measurement {
    /// Latency in whole microseconds, as recorded into the summary
    pub fn latency_micros(&self) -> f64 {
        self.latency.as_micros() as f64
    }

    /// Human-readable one-line summary
    pub fn describe(&self) -> String {
        format!(
            "Latency: {:?}, Download: {}, Upload: {}",
            self.latency,
            format_rate(self.download_rate),
            format_rate(self.upload_rate)
        )
    }
}

/// Format a byte rate as megabits per second
pub fn format_rate(bytes_per_second: f64) -> String {
    format!("{:.2} Mbps", bytes_per_second * 8.0 / 1_000_000.0)
}

/// Throughput of `bytes` transferred over `elapsed`
pub fn byte_rate(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    bytes as f64 / secs
}
