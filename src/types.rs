//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Measurement sub-tests run against the selected server, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStage {
    /// Round-trip latency probe
    Ping,
    /// Download throughput probe
    Download,
    /// Upload throughput probe
    Upload,
}

impl ProbeStage {
    /// All stages in execution order
    pub const ALL: [ProbeStage; 3] = [ProbeStage::Ping, ProbeStage::Download, ProbeStage::Upload];

    /// Short name used for span names and log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStage::Ping => "ping",
            ProbeStage::Download => "download",
            ProbeStage::Upload => "upload",
        }
    }

    /// Span name for the probe
    pub fn span_name(&self) -> &'static str {
        match self {
            ProbeStage::Ping => "ping_test",
            ProbeStage::Download => "download_test",
            ProbeStage::Upload => "upload_test",
        }
    }
}

impl fmt::Display for ProbeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStage::Ping => write!(f, "ping test"),
            ProbeStage::Download => write!(f, "download test"),
            ProbeStage::Upload => write!(f, "upload test"),
        }
    }
}

/// Whether spans are exported or dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingMode {
    /// Export spans over OTLP/gRPC
    Enabled,
    /// Keep the span API but export nothing
    Disabled,
}

impl TracingMode {
    /// Interpret the standard `OTEL_SDK_DISABLED` value
    pub fn from_sdk_disabled(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "true" => TracingMode::Disabled,
            _ => TracingMode::Enabled,
        }
    }
}
