//! The seam between the client and the network
//!
//! [`UreqTransport`] uses blocking ureq calls (same HTTP stack as the rest
//! of the tool) and moves them onto tokio's blocking pool, so a slow
//! response never stalls the other fetches of an evaluation.

use super::{ApiError, ApiResult};
use std::future::Future;
use std::time::Duration;
use tracing::trace;

/// A GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status, caching headers and body of a response. Non-2xx statuses are
/// returned as responses, not errors; the client classifies them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub etag: Option<String>,
    pub rate_limit_remaining: Option<u32>,
    pub body: String,
}

impl RawResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            etag: None,
            rate_limit_remaining: None,
            body: body.into(),
        }
    }

    pub fn not_modified() -> Self {
        Self::with_status(304, "")
    }

    pub fn etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    pub fn rate_limit_remaining(mut self, remaining: u32) -> Self {
        self.rate_limit_remaining = Some(remaining);
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs a single HTTP GET. Only transport faults are errors.
pub trait Transport: Send + Sync {
    fn get(&self, request: ApiRequest) -> impl Future<Output = ApiResult<RawResponse>> + Send;
}

/// ureq-backed transport
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::config::Config::builder()
            .http_status_as_error(false) // Status codes are classified by the client
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl Transport for UreqTransport {
    fn get(&self, request: ApiRequest) -> impl Future<Output = ApiResult<RawResponse>> + Send {
        let agent = self.agent.clone();
        async move {
            tokio::task::spawn_blocking(move || fetch_blocking(&agent, &request))
                .await
                .map_err(|e| ApiError::TransientNetwork(format!("request task failed: {e}")))?
        }
    }
}

fn fetch_blocking(agent: &ureq::Agent, request: &ApiRequest) -> ApiResult<RawResponse> {
    trace!("GET {}", request.url);

    let mut req = agent.get(request.url.as_str());
    for (name, value) in &request.headers {
        req = req.header(name.as_str(), value.as_str());
    }

    let response = req.call().map_err(classify_transport_error)?;

    let status = response.status().as_u16();
    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let etag = header("etag");
    let rate_limit_remaining = header("x-ratelimit-remaining").and_then(|v| v.parse().ok());

    let body = response
        .into_body()
        .read_to_string()
        .map_err(classify_transport_error)?;

    Ok(RawResponse {
        status,
        etag,
        rate_limit_remaining,
        body,
    })
}

fn classify_transport_error(err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::Timeout(_)
        | ureq::Error::Io(_)
        | ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound => ApiError::TransientNetwork(err.to_string()),
        other => ApiError::Unexpected {
            status: 0,
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_ignores_case() {
        let req = ApiRequest::get("https://api.github.com/repos/a/b")
            .header("If-None-Match", "\"abc\"")
            .header("Accept", "application/json");
        assert_eq!(req.header_value("if-none-match"), Some("\"abc\""));
        assert_eq!(req.header_value("authorization"), None);
    }

    #[test]
    fn test_raw_response_builders() {
        let resp = RawResponse::ok("{}").etag("W/\"1\"").rate_limit_remaining(10);
        assert!(resp.is_success());
        assert_eq!(resp.etag.as_deref(), Some("W/\"1\""));
        assert_eq!(resp.rate_limit_remaining, Some(10));
        assert!(!RawResponse::not_modified().is_success());
    }

    #[test]
    fn test_timeouts_are_transient() {
        let err = classify_transport_error(ureq::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset by peer",
        )));
        assert!(err.is_retryable());
        assert!(classify_transport_error(ureq::Error::HostNotFound).is_retryable());
    }
}
