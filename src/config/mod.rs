//! Configuration loading

pub mod env;

pub use env::EnvManager;

// Re-export from models for convenience
pub use crate::models::config::{Config, OTEL_SDK_DISABLED_VAR, PROMETHEUS_HOST_VAR};
