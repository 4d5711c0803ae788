//! Error handling for the speed test job

use crate::types::ProbeStage;
use thiserror::Error;

/// Exit status used for every failed run
pub const EXIT_FAILURE: i32 = 1;

/// Custom error types for the speed test job
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Tracer bootstrap or shutdown errors
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// Candidate server list could not be fetched
    #[error("error fetching server list: {0}")]
    ServerList(String),

    /// No usable measurement server
    #[error("server not found: {0}")]
    ServerNotFound(String),

    /// A ping, download or upload probe failed
    #[error("error running the {stage}: {message}")]
    Probe { stage: ProbeStage, message: String },

    /// Metric registration or recording errors
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Push gateway rejected or never received the push
    #[error("Metrics push error: {0}")]
    Push(String),

    /// Network connectivity errors
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(String),

    /// Parsing errors (URLs, JSON, etc.)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Run stage an error belongs to, used for the terminal log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Telemetry,
    SpeedTest,
    MetricsStorage,
    Other,
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new telemetry error
    pub fn telemetry<S: Into<String>>(message: S) -> Self {
        Self::Telemetry(message.into())
    }

    /// Create a new server list error
    pub fn server_list<S: Into<String>>(message: S) -> Self {
        Self::ServerList(message.into())
    }

    /// Create a new server-not-found error
    pub fn server_not_found<S: Into<String>>(message: S) -> Self {
        Self::ServerNotFound(message.into())
    }

    /// Create a new probe error for the given stage
    pub fn probe<S: Into<String>>(stage: ProbeStage, message: S) -> Self {
        Self::Probe {
            stage,
            message: message.into(),
        }
    }

    /// Create a new metrics error
    pub fn metrics<S: Into<String>>(message: S) -> Self {
        Self::Metrics(message.into())
    }

    /// Create a new push error
    pub fn push<S: Into<String>>(message: S) -> Self {
        Self::Push(message.into())
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    /// Create a new HTTP request error
    pub fn http_request<S: Into<String>>(message: S) -> Self {
        Self::HttpRequest(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Telemetry(_) => "TELEMETRY",
            Self::ServerList(_) => "SERVER_LIST",
            Self::ServerNotFound(_) => "SERVER_NOT_FOUND",
            Self::Probe { .. } => "PROBE",
            Self::Metrics(_) => "METRICS",
            Self::Push(_) => "PUSH",
            Self::Network(_) => "NETWORK",
            Self::HttpRequest(_) => "HTTP",
            Self::Parse(_) => "PARSE",
            Self::Io(_) => "IO",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Stage of the run this error aborted
    pub fn stage(&self) -> Stage {
        match self {
            Self::Config(_) => Stage::Config,
            Self::Telemetry(_) => Stage::Telemetry,
            Self::ServerList(_) | Self::ServerNotFound(_) | Self::Probe { .. } => Stage::SpeedTest,
            Self::Metrics(_) | Self::Push(_) => Stage::MetricsStorage,
            Self::Network(_)
            | Self::HttpRequest(_)
            | Self::Parse(_)
            | Self::Io(_)
            | Self::Internal(_) => Stage::Other,
        }
    }

    /// Message of the terminal log line for this error
    pub fn summary(&self) -> &'static str {
        match self.stage() {
            Stage::Config => "configuration invalid",
            Stage::Telemetry => "opentelemetry init",
            Stage::SpeedTest => "speed test failed",
            Stage::MetricsStorage => "metrics storage failed",
            Stage::Other => "run failed",
        }
    }

    /// Probe stage that failed, if any
    pub fn probe_stage(&self) -> Option<ProbeStage> {
        match self {
            Self::Probe { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        EXIT_FAILURE
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(error: url::ParseError) -> Self {
        Self::parse(format!("URL parse error: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_request() || error.is_timeout() {
            Self::network(error.to_string())
        } else {
            Self::http_request(error.to_string())
        }
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Attach stage context to foreign errors
pub trait ErrorContext<T> {
    /// Map the error into an `AppError` built from its message
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce(String) -> AppError;

    /// Map the error into a probe error for `stage`
    fn probe_context(self, stage: ProbeStage) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce(String) -> AppError,
    {
        self.map_err(|e| f(e.to_string()))
    }

    fn probe_context(self, stage: ProbeStage) -> Result<T> {
        self.with_context(|message| AppError::probe(stage, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_error = AppError::config("`PROMETHEUS_HOST` is not defined");
        assert_eq!(config_error.category(), "CONFIG");
        assert_eq!(config_error.stage(), Stage::Config);
        assert_eq!(config_error.exit_code(), 1);

        let push_error = AppError::push("connection refused");
        assert_eq!(push_error.category(), "PUSH");
        assert_eq!(push_error.stage(), Stage::MetricsStorage);
        assert_eq!(push_error.exit_code(), 1);
    }

    #[test]
    fn test_probe_error_names_stage() {
        let error = AppError::probe(ProbeStage::Download, "status 500");
        assert_eq!(error.to_string(), "error running the download test: status 500");
        assert_eq!(error.probe_stage(), Some(ProbeStage::Download));
        assert_eq!(error.summary(), "speed test failed");
    }

    #[test]
    fn test_summaries_per_stage() {
        assert_eq!(AppError::telemetry("x").summary(), "opentelemetry init");
        assert_eq!(AppError::server_not_found("empty").summary(), "speed test failed");
        assert_eq!(AppError::server_list("x").summary(), "speed test failed");
        assert_eq!(AppError::metrics("x").summary(), "metrics storage failed");
        assert_eq!(AppError::internal("x").summary(), "run failed");
    }

    #[test]
    fn test_every_error_exits_with_one() {
        let errors = [
            AppError::config("config"),
            AppError::telemetry("telemetry"),
            AppError::server_list("list"),
            AppError::server_not_found("none"),
            AppError::probe(ProbeStage::Ping, "ping"),
            AppError::metrics("metrics"),
            AppError::push("push"),
            AppError::network("network"),
            AppError::http_request("http"),
            AppError::parse("parse"),
            AppError::io("io"),
            AppError::internal("internal"),
        ];

        for error in &errors {
            assert_eq!(error.exit_code(), EXIT_FAILURE, "{}", error.category());
        }
    }

    #[test]
    fn test_error_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let app_error: AppError = io_error.into();
        assert_eq!(app_error.category(), "IO");

        let url_error = url::Url::parse("not a url").unwrap_err();
        let app_error: AppError = url_error.into();
        assert_eq!(app_error.category(), "PARSE");
        assert!(app_error.to_string().contains("URL parse error"));

        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let app_error: AppError = json_error.into();
        assert!(app_error.to_string().contains("JSON parse error"));
    }

    #[test]
    fn test_dotenv_error_conversion() {
        let dotenv_error = dotenv::Error::LineParse(".env".to_string(), 1);
        let app_error: AppError = dotenv_error.into();
        assert_eq!(app_error.category(), "CONFIG");
        assert!(app_error.to_string().contains("Environment file error"));
    }

    #[test]
    fn test_probe_context() {
        let result: std::result::Result<(), String> = Err("timed out".to_string());
        let error = result.probe_context(ProbeStage::Upload).unwrap_err();
        assert_eq!(error.to_string(), "error running the upload test: timed out");
    }

    #[test]
    fn test_with_context() {
        let result: std::result::Result<(), &str> = Err("dns failure");
        let error = result.with_context(AppError::server_list).unwrap_err();
        assert_eq!(error.category(), "SERVER_LIST");
        assert_eq!(error.to_string(), "error fetching server list: dns failure");
    }
}
