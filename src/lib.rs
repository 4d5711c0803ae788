//! Speed test job for Prometheus
//!
//! Runs a single latency, download and upload measurement against the
//! nearest speedtest.net server, pushes the results to a Prometheus push
//! gateway and traces the run over OTLP.

pub mod app;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod speedtest;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use context::RunContext;
pub use error::{AppError, Result};
pub use logging::Logger;
pub use models::{Config, Measurement};
pub use telemetry::{init_tracer, Telemetry};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// `service.name` of the exported spans and name of the logger
pub const SERVICE_NAME: &str = "speedtest";

/// Push gateway grouping job
pub const JOB_NAME: &str = "speedtest";
