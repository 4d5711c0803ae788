//! Push gateway addressing and HTTP transport

use super::exposition::TEXT_FORMAT;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use std::fmt;
use url::Url;

/// Validated push gateway base address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushGateway {
    base: Url,
}

impl PushGateway {
    /// Parse a `host:port` or full URL; `http://` is assumed when no scheme is given
    pub fn parse(address: &str) -> Result<Self> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(AppError::config("push gateway address is empty"));
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        };

        let base = Url::parse(&with_scheme).map_err(|e| {
            AppError::config(format!("invalid push gateway address '{}': {}", address, e))
        })?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(AppError::config(format!(
                "invalid push gateway address '{}': unsupported scheme '{}'",
                address,
                base.scheme()
            )));
        }
        if base.host_str().map_or(true, str::is_empty) {
            return Err(AppError::config(format!(
                "invalid push gateway address '{}': missing host",
                address
            )));
        }
        if base.query().is_some() || base.fragment().is_some() {
            return Err(AppError::config(format!(
                "invalid push gateway address '{}': query and fragment are not allowed",
                address
            )));
        }

        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `<base>/metrics/job/<job>`
    pub fn push_url(&self, job: &str) -> Result<Url> {
        if job.is_empty() || job.contains('/') {
            return Err(AppError::push(format!("invalid job name '{}'", job)));
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::push(format!("push gateway address '{}' cannot be a base", self.base)))?
            .pop_if_empty()
            .extend(["metrics", "job", job]);
        Ok(url)
    }
}

impl fmt::Display for PushGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)
    }
}

/// One push of a complete metric group
#[derive(Debug, Clone, PartialEq)]
pub struct PushRequest {
    /// Fully resolved grouping URL
    pub url: Url,
    /// Grouping key (`job` label)
    pub job: String,
    /// Rendered exposition body
    pub body: String,
}

/// Transport used to deliver pushes, abstracted for testing
#[async_trait]
pub trait MetricsPusher: Send + Sync {
    /// Replace the metrics of the request's group at the gateway
    async fn push(&self, request: PushRequest) -> Result<()>;
}

/// reqwest-backed push gateway client
#[derive(Debug, Clone)]
pub struct PushGatewayClient {
    client: Client,
}

impl PushGatewayClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("{}/{}", crate::PKG_NAME, crate::VERSION))
            .build()
            .map_err(|e| AppError::push(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl MetricsPusher for PushGatewayClient {
    async fn push(&self, request: PushRequest) -> Result<()> {
        let response = self
            .client
            .put(request.url.clone())
            .header(CONTENT_TYPE, TEXT_FORMAT)
            .body(request.body)
            .send()
            .await
            .map_err(|e| AppError::push(format!("error pushing to {}: {}", request.url, e)))?;

        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::ACCEPTED {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(AppError::push(format!(
            "unexpected status code {} while pushing to {}: {}",
            status.as_u16(),
            request.url,
            body.trim()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_host_port() {
        let gateway = PushGateway::parse("pushgateway:9091").unwrap();
        assert_eq!(gateway.base().as_str(), "http://pushgateway:9091/");
        assert_eq!(
            gateway.push_url("speedtest").unwrap().as_str(),
            "http://pushgateway:9091/metrics/job/speedtest"
        );
    }

    #[test]
    fn test_parse_full_url_with_prefix() {
        let gateway = PushGateway::parse("https://metrics.example.com/gateway/").unwrap();
        assert_eq!(
            gateway.push_url("speedtest").unwrap().as_str(),
            "https://metrics.example.com/gateway/metrics/job/speedtest"
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "   ", "http://", "ftp://gateway:21", "bad host:9091", "gw:9091/?x=1"] {
            let error = PushGateway::parse(bad).unwrap_err();
            assert_eq!(error.category(), "CONFIG", "{:?}", bad);
        }
    }

    #[test]
    fn test_push_url_rejects_bad_job() {
        let gateway = PushGateway::parse("localhost:9091").unwrap();
        assert!(gateway.push_url("").is_err());
        assert!(gateway.push_url("a/b").is_err());
    }

    #[tokio::test]
    async fn test_push_puts_text_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/metrics/job/speedtest"))
            .and(header("content-type", TEXT_FORMAT))
            .and(body_string_contains("download_speed 50000000"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = PushGateway::parse(&server.uri()).unwrap();
        let client = PushGatewayClient::new().unwrap();
        client
            .push(PushRequest {
                url: gateway.push_url("speedtest").unwrap(),
                job: "speedtest".to_string(),
                body: "download_speed 50000000\n".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_push_accepts_202() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let gateway = PushGateway::parse(&server.uri()).unwrap();
        let result = PushGatewayClient::new()
            .unwrap()
            .push(PushRequest {
                url: gateway.push_url("speedtest").unwrap(),
                job: "speedtest".to_string(),
                body: String::new(),
            })
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_push_rejected_status() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(400).set_body_string("text format parsing error"))
            .mount(&server)
            .await;

        let gateway = PushGateway::parse(&server.uri()).unwrap();
        let error = PushGatewayClient::new()
            .unwrap()
            .push(PushRequest {
                url: gateway.push_url("speedtest").unwrap(),
                job: "speedtest".to_string(),
                body: "garbage".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(error.category(), "PUSH");
        let message = error.to_string();
        assert!(message.contains("unexpected status code 400"));
        assert!(message.contains("text format parsing error"));
    }

    #[tokio::test]
    async fn test_push_transport_error() {
        // Port 9 (discard) is closed on test hosts
        let gateway = PushGateway::parse("127.0.0.1:9").unwrap();
        let error = PushGatewayClient::new()
            .unwrap()
            .push(PushRequest {
                url: gateway.push_url("speedtest").unwrap(),
                job: "speedtest".to_string(),
                body: String::new(),
            })
            .await
            .unwrap_err();

        assert_eq!(error.category(), "PUSH");
        assert!(error.to_string().contains("error pushing to"));
    }
}
