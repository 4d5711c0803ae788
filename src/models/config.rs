//! Resolved job configuration

use crate::metrics::PushGateway;
use crate::types::{AppError, Result, TracingMode};

/// Environment variable naming the push gateway
pub const PROMETHEUS_HOST_VAR: &str = "PROMETHEUS_HOST";

/// Standard OpenTelemetry switch turning the SDK into a noop
pub const OTEL_SDK_DISABLED_VAR: &str = "OTEL_SDK_DISABLED";

/// Everything the job needs before it starts measuring
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Push gateway the metrics are sent to
    pub gateway: PushGateway,

    /// Whether spans are exported
    pub tracing: TracingMode,
}

impl Config {
    /// Resolve from the push gateway address, taking the tracing mode from
    /// `OTEL_SDK_DISABLED`
    pub fn resolve(host: Option<&str>) -> Result<Self> {
        let disabled = std::env::var(OTEL_SDK_DISABLED_VAR).ok();
        Self::with_tracing(host, TracingMode::from_sdk_disabled(disabled.as_deref()))
    }

    pub fn with_tracing(host: Option<&str>, tracing: TracingMode) -> Result<Self> {
        let host = match host.map(str::trim) {
            Some(host) if !host.is_empty() => host,
            _ => {
                return Err(AppError::config(format!(
                    "`{}` is not defined",
                    PROMETHEUS_HOST_VAR
                )))
            }
        };

        Ok(Self {
            gateway: PushGateway::parse(host)?,
            tracing,
        })
    }

    pub fn from_cli(cli: &crate::cli::Cli) -> Result<Self> {
        Self::resolve(cli.prometheus_host.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_host() {
        for host in [None, Some(""), Some("   ")] {
            let error = Config::with_tracing(host, TracingMode::Enabled).unwrap_err();
            assert_eq!(error.category(), "CONFIG");
            assert_eq!(
                error.to_string(),
                "Configuration error: `PROMETHEUS_HOST` is not defined"
            );
        }
    }

    #[test]
    fn test_resolves_gateway() {
        let config = Config::with_tracing(Some(" pushgateway:9091 "), TracingMode::Disabled).unwrap();
        assert_eq!(config.gateway.base().as_str(), "http://pushgateway:9091/");
        assert_eq!(config.tracing, TracingMode::Disabled);
    }

    #[test]
    fn test_malformed_host_is_config_error() {
        let error = Config::with_tracing(Some("ftp://gateway"), TracingMode::Enabled).unwrap_err();
        assert_eq!(error.category(), "CONFIG");
    }
}
