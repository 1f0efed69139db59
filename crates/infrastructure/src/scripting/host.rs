//! Host capabilities behind the `pm` object.
//!
//! Each capability is a small view over the [`ScriptContext`]; the JS
//! bindings map them onto the sandbox once per invocation.

use serde_json::Value;
use vortex_application::variable_resolver::{VariableResolver, VariableScopes};
use vortex_domain::{
    ConsoleEntry, ConsoleLevel, HeaderMap, RequestDescriptor, ResponseDescriptor, StatusCode,
    TestResult, VariableMap, VariableScope, request::normalize_method,
};

use super::context::ScriptContext;

/// `get/set/unset/has/toObject/clear` over one scope.
#[derive(Debug)]
pub struct ScopeAccessor<'a> {
    variables: &'a mut VariableMap,
}

impl<'a> ScopeAccessor<'a> {
    /// Accessor for a named scope. Only the environment, collection, global
    /// and local scopes are script-visible.
    pub fn for_scope(ctx: &'a mut ScriptContext, scope: VariableScope) -> Option<Self> {
        let variables = match scope {
            VariableScope::Environment => &mut ctx.environment,
            VariableScope::Collection => &mut ctx.collection,
            VariableScope::Global => &mut ctx.globals,
            VariableScope::Local => &mut ctx.local,
            VariableScope::Extracted | VariableScope::Dynamic => return None,
        };
        Some(Self { variables })
    }

    /// Value of a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.variables.get(key).cloned()
    }

    /// Stores a value. Callers coerce to string before calling.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    /// Removes a key.
    pub fn unset(&mut self, key: &str) {
        self.variables.remove(key);
    }

    /// Whether a key is present.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }

    /// Removes every key.
    pub fn clear(&mut self) {
        self.variables.clear();
    }

    /// Snapshot of the scope.
    #[must_use]
    pub fn to_object(&self) -> VariableMap {
        self.variables.clone()
    }
}

/// `pm.variables`: reads cascade local, global, collection, environment;
/// writes go to the local scope only.
#[derive(Debug)]
pub struct VariableCascade<'a> {
    ctx: &'a mut ScriptContext,
}

impl<'a> VariableCascade<'a> {
    /// Cascade over a context.
    pub const fn new(ctx: &'a mut ScriptContext) -> Self {
        Self { ctx }
    }

    fn scopes(&self) -> VariableScopes<'_> {
        VariableScopes::new()
            .with(VariableScope::Local, &self.ctx.local)
            .with(VariableScope::Global, &self.ctx.globals)
            .with(VariableScope::Collection, &self.ctx.collection)
            .with(VariableScope::Environment, &self.ctx.environment)
    }

    /// First hit in priority order.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.scopes().lookup(key).map(str::to_string)
    }

    /// Whether any scope has the key.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.scopes().lookup(key).is_some()
    }

    /// Writes to the local scope.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.ctx.local.insert(key.into(), value.into());
    }

    /// All visible variables, higher-priority scopes winning.
    #[must_use]
    pub fn to_object(&self) -> VariableMap {
        let mut merged = self.ctx.environment.clone();
        for scope in [&self.ctx.collection, &self.ctx.globals, &self.ctx.local] {
            merged.extend(scope.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        merged
    }

    /// Substitutes `{{...}}` references and bare `$name` dynamic variables.
    #[must_use]
    pub fn replace_in(&self, template: &str) -> String {
        VariableResolver::new(self.scopes())
            .with_max_depth(self.ctx.max_depth)
            .replace_in(template)
    }
}

/// Mutable view over the request of a pre-request run.
#[derive(Debug)]
pub struct RequestView<'a> {
    request: &'a mut RequestDescriptor,
}

impl<'a> RequestView<'a> {
    /// View over a request.
    pub const fn new(request: &'a mut RequestDescriptor) -> Self {
        Self { request }
    }

    /// Current URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.request.url
    }

    /// Replaces the URL.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.request.url = url.into();
    }

    /// Current method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.request.method
    }

    /// Replaces the method, upper-cased.
    pub fn set_method(&mut self, method: &str) {
        self.request.method = normalize_method(method);
    }

    /// Raw body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.request.body
    }

    /// Replaces the raw body.
    pub fn set_body(&mut self, body: impl Into<String>) {
        self.request.body = body.into();
    }

    /// Header access.
    pub const fn headers(&mut self) -> &mut HeaderMap {
        &mut self.request.headers
    }
}

/// Response status classes recognised by `pm.response.to.be.*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// Exactly 200.
    Ok,
    /// 1xx.
    Info,
    /// 2xx.
    Success,
    /// 3xx.
    Redirection,
    /// 4xx.
    ClientError,
    /// 5xx.
    ServerError,
    /// 4xx or 5xx.
    Error,
    /// 202.
    Accepted,
    /// 400.
    BadRequest,
    /// 401.
    Unauthorized,
    /// 403.
    Forbidden,
    /// 404.
    NotFound,
    /// 429.
    RateLimited,
}

impl ResponseClass {
    /// Parses the property name used in scripts.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "ok" => Self::Ok,
            "info" => Self::Info,
            "success" => Self::Success,
            "redirection" => Self::Redirection,
            "clientError" => Self::ClientError,
            "serverError" => Self::ServerError,
            "error" => Self::Error,
            "accepted" => Self::Accepted,
            "badRequest" => Self::BadRequest,
            "unauthorized" => Self::Unauthorized,
            "forbidden" => Self::Forbidden,
            "notFound" => Self::NotFound,
            "rateLimited" => Self::RateLimited,
            _ => return None,
        })
    }

    const fn matches(self, status: StatusCode) -> bool {
        match self {
            Self::Ok => status.0 == 200,
            Self::Info => status.is_informational(),
            Self::Success => status.is_success(),
            Self::Redirection => status.is_redirection(),
            Self::ClientError => status.is_client_error(),
            Self::ServerError => status.is_server_error(),
            Self::Error => status.is_error(),
            Self::Accepted => status.0 == 202,
            Self::BadRequest => status.0 == 400,
            Self::Unauthorized => status.0 == 401,
            Self::Forbidden => status.0 == 403,
            Self::NotFound => status.0 == 404,
            Self::RateLimited => status.0 == 429,
        }
    }

    const fn describe(self) -> &'static str {
        match self {
            Self::Ok => "200",
            Self::Info => "1xx",
            Self::Success => "2xx",
            Self::Redirection => "3xx",
            Self::ClientError => "4xx",
            Self::ServerError => "5xx",
            Self::Error => "4xx or 5xx",
            Self::Accepted => "202",
            Self::BadRequest => "400",
            Self::Unauthorized => "401",
            Self::Forbidden => "403",
            Self::NotFound => "404",
            Self::RateLimited => "429",
        }
    }
}

/// A `pm.response.to.*` assertion.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseAssertion {
    /// `to.have.status(200)`.
    Status(u16),
    /// `to.have.status("Not Found")`.
    StatusText(String),
    /// `to.have.header(name, value?)`.
    Header {
        /// Header name, case-insensitive.
        name: String,
        /// Expected value, if given.
        value: Option<String>,
    },
    /// `to.have.jsonBody(path?, value?)`.
    JsonBody {
        /// Dotted path with optional `[index]` segments.
        path: Option<String>,
        /// Expected value at the path, if given.
        value: Option<Value>,
    },
    /// `to.be.ok`, `to.be.clientError`, ...
    Class(ResponseClass),
}

impl ResponseAssertion {
    /// Builds an assertion from the chain word and its JSON-encoded arguments.
    ///
    /// # Errors
    ///
    /// Describes a missing or mistyped argument, or an unknown chain word.
    pub fn from_call(kind: &str, args: &[Value]) -> Result<Self, String> {
        let text = |value: &Value| {
            value
                .as_str()
                .map_or_else(|| value.to_string(), str::to_string)
        };
        match kind {
            "status" => match args.first() {
                Some(Value::Number(code)) => code
                    .as_u64()
                    .and_then(|c| u16::try_from(c).ok())
                    .map(Self::Status)
                    .ok_or_else(|| format!("invalid status code {code}")),
                Some(Value::String(reason)) => Ok(Self::StatusText(reason.clone())),
                _ => Err("status() expects a status code or reason phrase".to_string()),
            },
            "header" => {
                let name = args
                    .first()
                    .ok_or_else(|| "header() expects a header name".to_string())?;
                Ok(Self::Header {
                    name: text(name),
                    value: args.get(1).filter(|v| !v.is_null()).map(text),
                })
            }
            "jsonBody" => Ok(Self::JsonBody {
                path: args.first().filter(|v| !v.is_null()).map(text),
                value: args.get(1).cloned(),
            }),
            other => ResponseClass::parse(other)
                .map(Self::Class)
                .ok_or_else(|| format!("unsupported response assertion: {other}")),
        }
    }
}

/// Read-only view over the response of a post-response run.
#[derive(Debug, Clone, Copy)]
pub struct ResponseView<'a> {
    response: &'a ResponseDescriptor,
}

impl<'a> ResponseView<'a> {
    /// View over a response.
    #[must_use]
    pub const fn new(response: &'a ResponseDescriptor) -> Self {
        Self { response }
    }

    /// Status code.
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.response.status
    }

    /// Reason phrase of the status.
    #[must_use]
    pub const fn status_text(&self) -> &'static str {
        self.response.status_code().reason_phrase()
    }

    /// Body text.
    #[must_use]
    pub fn text(&self) -> &'a str {
        &self.response.body
    }

    /// Parsed JSON body.
    ///
    /// # Errors
    ///
    /// Describes why the body is not JSON.
    pub fn json(&self) -> Result<Value, String> {
        serde_json::from_str(&self.response.body).map_err(|e| {
            let preview: String = self.response.body.chars().take(40).collect();
            format!("Response body is not valid JSON ({e}); body starts with: {preview:?}")
        })
    }

    /// The shape scripts receive as `pm.response`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "code": self.code(),
            "status": self.status_text(),
            "headers": self.response.headers.to_map(),
            "body": self.response.body,
            "responseTime": self.response.response_time_ms,
            "responseSize": self.response.size(),
        })
    }

    /// Evaluates an assertion, returning the failure message.
    #[must_use]
    pub fn check(&self, assertion: &ResponseAssertion, negate: bool) -> Option<String> {
        let not = if negate { "not " } else { "" };
        let (passed, message) = match assertion {
            ResponseAssertion::Status(code) => (
                self.code() == *code,
                format!(
                    "expected response to {not}have status code {code} but got {}",
                    self.code()
                ),
            ),
            ResponseAssertion::StatusText(text) => (
                self.status_text().eq_ignore_ascii_case(text),
                format!(
                    "expected response to {not}have status reason '{text}' but got '{}'",
                    self.status_text()
                ),
            ),
            ResponseAssertion::Header { name, value } => {
                let actual = self.response.headers.get(name);
                match value {
                    None => (
                        actual.is_some(),
                        format!("expected response to {not}have header {name}"),
                    ),
                    Some(expected) => (
                        actual.is_some_and(|a| a == expected),
                        format!(
                            "expected response to {not}have header {name} with value '{expected}' but got {}",
                            actual.map_or_else(|| "no such header".to_string(), |a| format!("'{a}'"))
                        ),
                    ),
                }
            }
            ResponseAssertion::JsonBody { path, value } => match self.json() {
                Err(e) => (false, format!("expected response to have a JSON body: {e}")),
                Ok(body) => match path {
                    None => (true, format!("expected response to {not}have a JSON body")),
                    Some(path) => {
                        let found = json_path(&body, path);
                        match value {
                            None => (
                                found.is_some(),
                                format!("expected response JSON to {not}have property '{path}'"),
                            ),
                            Some(expected) => (
                                found == Some(expected),
                                format!(
                                    "expected response JSON '{path}' to {not}equal {expected} but got {}",
                                    found.map_or_else(|| "undefined".to_string(), Value::to_string)
                                ),
                            ),
                        }
                    }
                },
            },
            ResponseAssertion::Class(class) => (
                class.matches(self.response.status_code()),
                format!(
                    "expected response code to {not}be {} but found {}",
                    class.describe(),
                    self.code()
                ),
            ),
        };
        (passed == negate).then_some(message)
    }
}

/// Follows `a.b[0].c` through a JSON value.
#[must_use]
pub fn json_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    let mut current = value;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        let (key, indexes) = segment.split_once('[').unwrap_or((segment, ""));
        if !key.is_empty() {
            current = current.get(key)?;
        }
        if !indexes.is_empty() {
            for index in indexes.trim_end_matches(']').split("][") {
                current = current.get(index.parse::<usize>().ok()?)?;
            }
        }
    }
    Some(current)
}

/// Console capability.
#[derive(Debug)]
pub struct Console<'a> {
    entries: &'a mut Vec<ConsoleEntry>,
}

impl<'a> Console<'a> {
    /// Console writing to a context.
    pub const fn new(entries: &'a mut Vec<ConsoleEntry>) -> Self {
        Self { entries }
    }

    /// Appends an entry for a `console.*` method.
    pub fn write(&mut self, method: &str, message: impl Into<String>) {
        self.entries
            .push(ConsoleEntry::new(ConsoleLevel::from_method(method), message));
    }
}

/// Records `pm.test` outcomes.
#[derive(Debug)]
pub struct TestRecorder<'a> {
    results: &'a mut Vec<TestResult>,
}

impl<'a> TestRecorder<'a> {
    /// Recorder writing to a context.
    pub const fn new(results: &'a mut Vec<TestResult>) -> Self {
        Self { results }
    }

    /// Appends one result.
    pub fn record(&mut self, name: impl Into<String>, error: Option<String>) {
        self.results.push(match error {
            None => TestResult::passed(name),
            Some(error) => TestResult::failed(name, error),
        });
    }
}
