//! Data models and structures for the speed test job

pub mod config;
pub mod measurement;

// Re-export main model types
pub use config::Config;
pub use measurement::{LatencyStats, Measurement, Server, ServerSummary};
