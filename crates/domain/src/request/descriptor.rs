//! Request descriptors handed to scripts and to the HTTP collaborator

use serde::{Deserialize, Serialize};
use url::Url;

use super::HeaderMap;
use crate::environment::VariableMap;
use crate::error::{DomainError, DomainResult};

/// Upper-cases an HTTP method, the form every descriptor stores.
#[must_use]
pub fn normalize_method(method: &str) -> String {
    method.trim().to_ascii_uppercase()
}

/// The request a pre-request script can inspect and mutate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    /// Target URL (may contain variable placeholders).
    pub url: String,
    /// HTTP method, upper-cased.
    pub method: String,
    /// Request headers.
    #[serde(default)]
    pub headers: HeaderMap,
    /// Raw request body. Empty when the request has no body.
    #[serde(default)]
    pub body: String,
    /// Query parameters appended to the URL when the request is sent.
    #[serde(default)]
    pub params: VariableMap,
}

impl Default for RequestDescriptor {
    fn default() -> Self {
        Self::get("")
    }
}

impl RequestDescriptor {
    /// Creates a descriptor with no headers, body or params.
    #[must_use]
    pub fn new(method: &str, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: normalize_method(method),
            headers: HeaderMap::new(),
            body: String::new(),
            params: VariableMap::new(),
        }
    }

    /// Creates a GET descriptor.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Sets a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.upsert(name, value);
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a query parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Returns the URL with the query parameters merged in.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidUrl`] if the URL cannot be parsed.
    pub fn full_url(&self) -> DomainResult<String> {
        let mut url =
            Url::parse(&self.url).map_err(|e| DomainError::InvalidUrl(format!("{e}: {}", self.url)))?;
        if !self.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.params {
                pairs.append_pair(name, value);
            }
        }
        Ok(url.into())
    }

    /// Converts the descriptor into the shape the HTTP collaborator consumes.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn to_outbound(&self) -> DomainResult<OutboundRequest> {
        Ok(OutboundRequest {
            url: self.full_url()?,
            method: self.method.clone(),
            headers: self.headers.clone(),
            body: (!self.body.is_empty()).then(|| self.body.clone()),
        })
    }
}

/// A request issued to the HTTP collaborator, either by the pipeline or by a
/// script through `pm.sendRequest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundRequest {
    /// Absolute URL.
    pub url: String,
    /// HTTP method, upper-cased.
    #[serde(default = "default_method")]
    pub method: String,
    /// Request headers.
    #[serde(default)]
    pub headers: HeaderMap,
    /// Optional raw body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl OutboundRequest {
    /// Creates a GET request for a bare URL.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: default_method(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Validates that the URL is absolute and uses http or https.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidUrl`] otherwise.
    pub fn parse_url(&self) -> DomainResult<Url> {
        let url = Url::parse(&self.url)
            .map_err(|e| DomainError::InvalidUrl(format!("{e}: {}", self.url)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(DomainError::InvalidUrl(format!(
                "unsupported scheme '{other}': {}",
                self.url
            ))),
        }
    }

    /// Returns the host of the URL, if it parses.
    #[must_use]
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
    }
}
