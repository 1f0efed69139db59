//! Cookies visible to scripts through `pm.cookies`.
//!
//! The jar lives for one script invocation. In post-response mode it is
//! seeded from the response `Set-Cookie` headers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single HTTP cookie.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Domain the cookie belongs to.
    #[serde(default)]
    pub domain: String,
    /// Path the cookie applies to.
    #[serde(default = "default_path")]
    pub path: String,
    /// Expiration time (None for session cookies).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    /// `HttpOnly` flag.
    #[serde(default)]
    pub http_only: bool,
    /// Secure flag.
    #[serde(default)]
    pub secure: bool,
    /// `SameSite` attribute.
    #[serde(default)]
    pub same_site: SameSite,
}

fn default_path() -> String {
    "/".to_string()
}

impl Cookie {
    /// Create a session cookie for the root path.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: default_path(),
            expires: None,
            http_only: false,
            secure: false,
            same_site: SameSite::default(),
        }
    }

    /// Check if the cookie is expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires.is_some_and(|exp| exp < Utc::now())
    }

    /// Whether the cookie should be sent to `host`. A cookie without a
    /// domain matches every host.
    #[must_use]
    pub fn matches_host(&self, host: &str) -> bool {
        let domain = self.domain.trim_start_matches('.');
        if domain.is_empty() {
            return true;
        }
        let host = host.to_ascii_lowercase();
        let domain = domain.to_ascii_lowercase();
        host == domain || host.ends_with(&format!(".{domain}"))
    }

    /// Format for a `Cookie` request header.
    #[must_use]
    pub fn to_cookie_header(&self) -> String {
        format!("{}={}", self.name, self.value)
    }

    /// Parse one `Set-Cookie` header value.
    ///
    /// Returns `None` when the value has no `name=value` pair or the name is
    /// empty. Unknown attributes are ignored.
    #[must_use]
    pub fn from_set_cookie(header: &str, request_domain: &str) -> Option<Self> {
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let mut cookie = Self::new(name, value.trim(), request_domain);

        for part in parts.map(str::trim).filter(|p| !p.is_empty()) {
            let (attr, val) = part
                .split_once('=')
                .map_or((part, ""), |(a, v)| (a.trim(), v.trim()));
            match attr.to_ascii_lowercase().as_str() {
                "domain" => cookie.domain = val.trim_start_matches('.').to_string(),
                "path" => cookie.path = val.to_string(),
                "expires" => {
                    if let Ok(exp) = DateTime::parse_from_rfc2822(val) {
                        cookie.expires = Some(exp.with_timezone(&Utc));
                    }
                }
                "max-age" => {
                    if let Ok(secs) = val.parse::<i64>() {
                        cookie.expires = Some(Utc::now() + chrono::Duration::seconds(secs));
                    }
                }
                "samesite" => cookie.same_site = SameSite::parse(val),
                "httponly" => cookie.http_only = true,
                "secure" => cookie.secure = true,
                _ => {}
            }
        }

        Some(cookie)
    }
}

/// `SameSite` attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    /// Cookies are sent with all requests.
    #[default]
    None,
    /// Cookies are sent with top-level navigations.
    Lax,
    /// Cookies are only sent in first-party context.
    Strict,
}

impl SameSite {
    /// Parses an attribute value, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "strict" => Self::Strict,
            "lax" => Self::Lax,
            _ => Self::None,
        }
    }
}

/// Name-keyed cookie store backing `pm.cookies`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CookieJar {
    cookies: BTreeMap<String, Cookie>,
}

impl CookieJar {
    /// Create an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a jar from `Set-Cookie` header values.
    ///
    /// Each line of each value is parsed as one cookie. Expired cookies are
    /// dropped; a later cookie with the same name replaces an earlier one.
    #[must_use]
    pub fn from_set_cookie_headers<'a>(
        values: impl IntoIterator<Item = &'a str>,
        request_domain: &str,
    ) -> Self {
        let mut jar = Self::new();
        for line in values.into_iter().flat_map(str::lines) {
            if let Some(cookie) = Cookie::from_set_cookie(line, request_domain) {
                jar.add(cookie);
            }
        }
        jar
    }

    /// Stores a cookie, replacing any cookie with the same name.
    pub fn add(&mut self, cookie: Cookie) {
        if cookie.is_expired() {
            self.cookies.remove(&cookie.name);
            return;
        }
        self.cookies.insert(cookie.name.clone(), cookie);
    }

    /// Sets a plain session cookie.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let domain = self
            .cookies
            .get(&name)
            .map(|c| c.domain.clone())
            .unwrap_or_default();
        self.add(Cookie::new(name, value, domain));
    }

    /// Returns the value of a cookie.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|c| c.value.as_str())
    }

    /// Returns the full cookie.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.get(name)
    }

    /// Checks whether a cookie is present.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    /// Removes a cookie.
    pub fn remove(&mut self, name: &str) -> Option<Cookie> {
        self.cookies.remove(name)
    }

    /// Clear all cookies.
    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    /// Name to value mapping, as returned by `pm.cookies.toObject()`.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.cookies
            .iter()
            .map(|(k, c)| (k.clone(), c.value.clone()))
            .collect()
    }

    /// Value for a `Cookie` request header sent to `host`, or `None` when no
    /// cookie applies.
    #[must_use]
    pub fn cookie_header(&self, host: &str) -> Option<String> {
        let pairs: Vec<String> = self
            .cookies
            .values()
            .filter(|c| c.matches_host(host))
            .map(Cookie::to_cookie_header)
            .collect();
        (!pairs.is_empty()).then(|| pairs.join("; "))
    }

    /// Number of cookies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Check if the jar is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}
