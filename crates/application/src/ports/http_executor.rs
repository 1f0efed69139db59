//! HTTP executor port
//!
//! The black-box HTTP collaborator used for the main request and for
//! `pm.sendRequest` calls made while draining a script.

use async_trait::async_trait;
use vortex_domain::{HttpResponse, OutboundRequest};

/// Errors that can occur while executing a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpExecutorError {
    /// The URL could not be parsed or uses an unsupported scheme.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The request did not complete in time.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout {
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// The connection could not be established.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The response body could not be read.
    #[error("Failed to read response body: {0}")]
    Body(String),

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

/// Port for executing HTTP requests.
///
/// Implementations do not retry or rate-limit; callers apply their own
/// timeouts on top.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    /// Executes a request and returns the response.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid URLs and transport failures. HTTP error
    /// statuses are successful responses.
    async fn execute(&self, request: &OutboundRequest) -> Result<HttpResponse, HttpExecutorError>;
}

#[async_trait]
impl<T: HttpExecutor + ?Sized> HttpExecutor for std::sync::Arc<T> {
    async fn execute(&self, request: &OutboundRequest) -> Result<HttpResponse, HttpExecutorError> {
        (**self).execute(request).await
    }
}
