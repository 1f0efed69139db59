//! Response descriptors
//!
//! [`ResponseDescriptor`] is what a post-response script sees;
//! [`HttpResponse`] is what the HTTP collaborator returns.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::request::HeaderMap;

/// HTTP status code with semantic helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusCode(pub u16);

impl StatusCode {
    /// Creates a new `StatusCode`.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns true if this is a 1xx informational status.
    #[must_use]
    pub const fn is_informational(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    /// Returns true if this is a 2xx success status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Returns true if this is a 3xx redirection status.
    #[must_use]
    pub const fn is_redirection(&self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    /// Returns true if this is a 4xx client error status.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }

    /// Returns true if this is a 5xx server error status.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.0 >= 500 && self.0 < 600
    }

    /// Returns true if this is any error status (4xx or 5xx).
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.is_client_error() || self.is_server_error()
    }

    /// Returns the standard reason phrase for this status code.
    #[must_use]
    pub const fn reason_phrase(&self) -> &'static str {
        match self.0 {
            100 => "Continue",
            101 => "Switching Protocols",
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            204 => "No Content",
            301 => "Moved Permanently",
            302 => "Found",
            304 => "Not Modified",
            307 => "Temporary Redirect",
            308 => "Permanent Redirect",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            408 => "Request Timeout",
            409 => "Conflict",
            415 => "Unsupported Media Type",
            422 => "Unprocessable Entity",
            429 => "Too Many Requests",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            504 => "Gateway Timeout",
            _ => "Unknown",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.0, self.reason_phrase())
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

/// The response a post-response script can inspect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseDescriptor {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    #[serde(default)]
    pub headers: HeaderMap,
    /// Response body as text.
    #[serde(default)]
    pub body: String,
    /// Elapsed time of the real request in milliseconds.
    #[serde(default)]
    pub response_time_ms: f64,
}

impl ResponseDescriptor {
    /// Creates a descriptor with an empty header map.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>, response_time_ms: f64) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            response_time_ms,
        }
    }

    /// Sets a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.upsert(name, value);
        self
    }

    /// Returns the status as a `StatusCode` struct.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        StatusCode::new(self.status)
    }

    /// Returns the body size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.body.len()
    }
}

impl From<&HttpResponse> for ResponseDescriptor {
    fn from(response: &HttpResponse) -> Self {
        Self {
            status: response.status_code,
            headers: response.headers.clone(),
            body: response.text.clone(),
            response_time_ms: response.elapsed_ms(),
        }
    }
}

/// Result of a real HTTP call made by the HTTP collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers.
    #[serde(default)]
    pub headers: HeaderMap,
    /// Response body decoded as text (lossy for binary bodies).
    #[serde(default)]
    pub text: String,
    /// Time the request took.
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
    /// Response size in bytes.
    pub size: usize,
}

impl HttpResponse {
    /// Creates a response from raw body bytes.
    #[must_use]
    pub fn new(status_code: u16, headers: HeaderMap, body: &[u8], elapsed: Duration) -> Self {
        Self {
            status_code,
            headers,
            text: String::from_utf8_lossy(body).into_owned(),
            elapsed,
            size: body.len(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    /// Returns the reason phrase for the status code.
    #[must_use]
    pub const fn status_text(&self) -> &'static str {
        StatusCode::new(self.status_code).reason_phrase()
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Truncation is acceptable: durations over ~584 million years are not realistic
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status_code_categories() {
        assert!(StatusCode::new(101).is_informational());
        assert!(StatusCode::new(204).is_success());
        assert!(StatusCode::new(301).is_redirection());
        assert!(!StatusCode::new(400).is_redirection());
        assert!(StatusCode::new(404).is_client_error());
        assert!(StatusCode::new(503).is_server_error());
        assert!(StatusCode::new(503).is_error());
        assert!(!StatusCode::new(302).is_error());
    }

    #[test]
    fn test_status_code_display() {
        assert_eq!(StatusCode::new(200).to_string(), "200 OK");
        assert_eq!(StatusCode::new(404).to_string(), "404 Not Found");
        assert_eq!(StatusCode::new(799).reason_phrase(), "Unknown");
    }

    #[test]
    fn test_http_response_from_bytes() {
        let ok = HttpResponse::new(200, HeaderMap::new(), br#"{"id":1}"#, Duration::from_millis(12));
        assert_eq!(ok.text, r#"{"id":1}"#);
        assert_eq!(ok.size, 8);
        assert_eq!(ok.status_text(), "OK");

        let binary = HttpResponse::new(200, HeaderMap::new(), &[0x66, 0xff], Duration::ZERO);
        assert_eq!(binary.size, 2);
        assert_eq!(binary.text, "f\u{fffd}");
    }

    #[test]
    fn test_descriptor_from_http_response() {
        let response = HttpResponse::new(
            201,
            [("Location", "/users/1")].into_iter().collect(),
            b"created",
            Duration::from_millis(250),
        );
        let descriptor = ResponseDescriptor::from(&response);
        assert_eq!(descriptor.status, 201);
        assert_eq!(descriptor.headers.get("location"), Some("/users/1"));
        assert!((descriptor.response_time_ms - 250.0).abs() < f64::EPSILON);
    }
}
