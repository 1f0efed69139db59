//! HTTP executor implementation using reqwest.
//!
//! This adapter implements the `HttpExecutor` port for the request pipeline
//! and for `pm.sendRequest` calls drained by the script engine.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use vortex_application::ports::{HttpExecutor, HttpExecutorError};
use vortex_domain::{HeaderMap, HttpResponse, OutboundRequest};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REDIRECTS: usize = 10;

/// HTTP executor backed by `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestHttpExecutor {
    client: Client,
    timeout: Duration,
}

impl ReqwestHttpExecutor {
    /// Creates an executor with default settings.
    ///
    /// Default configuration:
    /// - Request timeout: 30 seconds
    /// - Follow redirects: up to 10
    /// - User-Agent: "vortex-script/<version>"
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn new() -> Result<Self, HttpExecutorError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates an executor whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpExecutorError> {
        let client = Client::builder()
            .user_agent(concat!("vortex-script/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|e| HttpExecutorError::Other(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    /// Wraps an existing reqwest client.
    #[must_use]
    pub const fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    fn to_reqwest_method(method: &str) -> Result<Method, HttpExecutorError> {
        Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| HttpExecutorError::Other(format!("Invalid HTTP method: {method}")))
    }

    /// Collects response headers. Repeated `Set-Cookie` headers are joined
    /// with newlines, other repeated headers with `", "`.
    fn collect_headers(headers: &reqwest::header::HeaderMap) -> HeaderMap {
        let mut collected = HeaderMap::new();
        for name in headers.keys() {
            let separator = if name == reqwest::header::SET_COOKIE {
                "\n"
            } else {
                ", "
            };
            let value = headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(separator);
            collected.upsert(name.as_str(), value);
        }
        collected
    }

    /// Maps reqwest errors to `HttpExecutorError`.
    fn map_error(&self, error: &reqwest::Error) -> HttpExecutorError {
        if error.is_timeout() {
            #[allow(clippy::cast_possible_truncation)]
            return HttpExecutorError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            };
        }
        if error.is_connect() {
            return HttpExecutorError::ConnectionFailed(error.to_string());
        }
        if error.is_redirect() {
            return HttpExecutorError::Other(format!(
                "Too many redirects (max {MAX_REDIRECTS})"
            ));
        }
        if error.is_body() || error.is_decode() {
            return HttpExecutorError::Body(error.to_string());
        }
        HttpExecutorError::Other(error.to_string())
    }
}

#[async_trait]
impl HttpExecutor for ReqwestHttpExecutor {
    async fn execute(&self, request: &OutboundRequest) -> Result<HttpResponse, HttpExecutorError> {
        let url = Url::parse(&request.url)
            .map_err(|e| HttpExecutorError::InvalidUrl(format!("{e}: {}", request.url)))?;
        let method = Self::to_reqwest_method(&request.method)?;

        let start = Instant::now();

        let mut builder = self.client.request(method, url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| self.map_error(&e))?;
        let status = response.status().as_u16();
        let headers = Self::collect_headers(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| HttpExecutorError::Body(e.to_string()))?;

        Ok(HttpResponse::new(status, headers, &body, start.elapsed()))
    }
}
