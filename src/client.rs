//! HTTP request client for the backend.
//!
//! [`RequestClient`] is the single place where the backend origin, the
//! default content type, and timeouts are applied. Every call is a single
//! attempt: there is no retry and no backoff, so a failure is reported to the
//! caller exactly once and a new user action is needed to try again.
//!
//! # Failure surface
//!
//! | Cause | Error |
//! |-------|-------|
//! | connection refused, DNS, TLS | [`ApiError::Network`] |
//! | no response within the timeout | [`ApiError::Timeout`] |
//! | non-2xx status | [`ApiError::Status`] |
//! | 2xx body that does not decode | [`ApiError::Decode`] |

use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::config::Config;

/// Timeout applied when the caller does not override it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(60_000);

/// A failed backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    Network(String),
    Timeout(Duration),
    Status { status: u16, body: String },
    Decode(String),
    /// The request was dropped before it settled (e.g. Ctrl-C).
    Cancelled,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Network(e) => write!(f, "network error: {}", e),
            ApiError::Timeout(d) => write!(f, "request timed out after {} ms", d.as_millis()),
            ApiError::Status { status, body } if body.is_empty() => {
                write!(f, "backend returned HTTP {}", status)
            }
            ApiError::Status { status, body } => {
                write!(f, "backend returned HTTP {}: {}", status, body)
            }
            ApiError::Decode(e) => write!(f, "unexpected response body: {}", e),
            ApiError::Cancelled => write!(f, "request cancelled"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(timeout)
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Request payload. JSON unless the caller hands over a multipart form.
pub enum RequestBody {
    Json(serde_json::Value),
    Multipart(reqwest::multipart::Form),
}

/// Per-call overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Thin wrapper over `reqwest::Client` bound to one backend origin.
#[derive(Debug, Clone)]
pub struct RequestClient {
    http: reqwest::Client,
    base_url: String,
    default_timeout: Duration,
}

impl RequestClient {
    pub fn new(base_url: &str, default_timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pagewise/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_timeout,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(&config.backend.url, config.default_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a backend path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POST `body` to `path` and decode the 2xx response as `R`.
    pub async fn post<R: DeserializeOwned>(
        &self,
        path: &str,
        body: RequestBody,
        options: RequestOptions,
    ) -> Result<R, ApiError> {
        let timeout = options.timeout.unwrap_or(self.default_timeout);
        let url = self.url(path);
        debug!(%url, timeout_ms = timeout.as_millis() as u64, "POST");

        let request = self.http.post(&url).timeout(timeout);
        let request = match body {
            RequestBody::Json(value) => request.json(&value),
            RequestBody::Multipart(form) => request.multipart(form),
        };

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(%url, status = status.as_u16(), "backend error status");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_reqwest(e, timeout))?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = RequestClient::new("http://127.0.0.1:5040/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:5040");
        assert_eq!(client.url("/chat"), "http://127.0.0.1:5040/chat");
        assert_eq!(client.url("summarize"), "http://127.0.0.1:5040/summarize");
    }

    #[test]
    fn test_url_keeps_base_path_prefix() {
        let client = RequestClient::new("https://example.com/api", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            client.url("/ask_with_context"),
            "https://example.com/api/ask_with_context"
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            ApiError::Timeout(Duration::from_millis(120_000)).to_string(),
            "request timed out after 120000 ms"
        );
        assert_eq!(
            ApiError::Status {
                status: 502,
                body: String::new()
            }
            .to_string(),
            "backend returned HTTP 502"
        );
        assert_eq!(ApiError::Cancelled.to_string(), "request cancelled");
    }

    #[test]
    fn test_default_timeout_is_sixty_seconds() {
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(60));
        let client = RequestClient::from_config(&Config::minimal()).unwrap();
        assert_eq!(client.default_timeout, DEFAULT_TIMEOUT);
    }
}
