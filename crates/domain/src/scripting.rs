//! Pre-request and post-response scripting.
//!
//! This module provides the types that flow in and out of a script
//! execution: the script itself, the inputs for each mode, and the
//! results handed back to the caller.

use serde::{Deserialize, Serialize};

use crate::environment::VariableMap;
use crate::request::{HeaderMap, RequestDescriptor};
use crate::response::ResponseDescriptor;

/// A script that can be executed before a request or after a response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Script {
    /// The script content.
    pub content: String,
    /// Whether the script is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

impl Default for Script {
    fn default() -> Self {
        Self {
            content: String::new(),
            enabled: true,
        }
    }
}

impl Script {
    /// Create a new empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new script with content.
    #[must_use]
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            enabled: true,
        }
    }

    /// Check if the script is empty or whitespace only.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Check if the script should run.
    #[must_use]
    pub fn should_run(&self) -> bool {
        self.enabled && !self.is_empty()
    }
}

/// Pre-request and post-response scripts for a request.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RequestScripts {
    /// Script to run before the request.
    #[serde(default, skip_serializing_if = "Script::is_empty")]
    pub pre_request: Script,
    /// Script to run after the response.
    #[serde(default, skip_serializing_if = "Script::is_empty")]
    pub post_response: Script,
}

impl RequestScripts {
    /// Create new empty scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if both scripts are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pre_request.is_empty() && self.post_response.is_empty()
    }

    /// Set the pre-request script.
    #[must_use]
    pub fn with_pre_request(mut self, script: Script) -> Self {
        self.pre_request = script;
        self
    }

    /// Set the post-response script.
    #[must_use]
    pub fn with_post_response(mut self, script: Script) -> Self {
        self.post_response = script;
        self
    }
}

/// Which of the two script entry points is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScriptMode {
    /// Runs before the request is sent; the request is mutable.
    #[default]
    PreRequest,
    /// Runs after the response arrives; the response is read-only.
    PostResponse,
}

impl ScriptMode {
    /// The value scripts see as `pm.info.eventName`.
    #[must_use]
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::PreRequest => "prerequest",
            Self::PostResponse => "test",
        }
    }
}

/// Severity of a console entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    /// `console.log`, `console.info`, `console.debug`.
    Info,
    /// `console.warn`.
    Warning,
    /// `console.error`.
    Error,
}

impl ConsoleLevel {
    /// Maps a `console.*` method name to its level.
    #[must_use]
    pub fn from_method(method: &str) -> Self {
        match method {
            "warn" | "warning" => Self::Warning,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }

    /// Returns the level name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// One line of script console output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    /// Severity.
    pub level: ConsoleLevel,
    /// Formatted message.
    pub message: String,
}

impl ConsoleEntry {
    /// Creates a console entry.
    #[must_use]
    pub fn new(level: ConsoleLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Outcome of one `pm.test(name, fn)` call. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    /// Test name as given by the script.
    pub name: String,
    /// Whether the test body completed without throwing.
    pub passed: bool,
    /// Message of the thrown error for failed tests.
    pub error: Option<String>,
}

impl TestResult {
    /// A passing result.
    #[must_use]
    pub fn passed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            error: None,
        }
    }

    /// A failing result.
    #[must_use]
    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            error: Some(error.into()),
        }
    }
}

/// Inputs of a pre-request run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreRequestInput {
    /// The request about to be sent.
    pub request: RequestDescriptor,
    /// Active environment variables.
    #[serde(default)]
    pub environment: VariableMap,
    /// Active collection variables.
    #[serde(default)]
    pub collection_variables: VariableMap,
    /// Global variables.
    #[serde(default)]
    pub globals: VariableMap,
}

/// Result of a pre-request run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreRequestOutput {
    /// Possibly rewritten URL.
    pub url: String,
    /// Possibly rewritten method, upper-cased.
    pub method: String,
    /// Possibly rewritten headers.
    pub headers: HeaderMap,
    /// Possibly rewritten body.
    pub body: String,
    /// Query parameters.
    pub params: VariableMap,
    /// Environment scope after the run.
    pub environment: VariableMap,
    /// Collection scope after the run.
    pub collection_variables: VariableMap,
    /// Global scope after the run.
    pub globals: VariableMap,
    /// Console output in call order.
    pub console_logs: Vec<ConsoleEntry>,
    /// Wall-clock time of the run, rounded to two decimals.
    pub execution_time_ms: f64,
}

impl PreRequestOutput {
    /// Wraps the inputs unchanged, as returned for an empty script.
    #[must_use]
    pub fn unchanged(input: PreRequestInput) -> Self {
        let PreRequestInput {
            request,
            environment,
            collection_variables,
            globals,
        } = input;
        Self {
            url: request.url,
            method: request.method,
            headers: request.headers,
            body: request.body,
            params: request.params,
            environment,
            collection_variables,
            globals,
            console_logs: Vec::new(),
            execution_time_ms: 0.0,
        }
    }

    /// Returns the request fields as a descriptor.
    #[must_use]
    pub fn request(&self) -> RequestDescriptor {
        RequestDescriptor {
            url: self.url.clone(),
            method: self.method.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            params: self.params.clone(),
        }
    }
}

/// Inputs of a post-response run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostResponseInput {
    /// The response that arrived.
    pub response: ResponseDescriptor,
    /// Active environment variables.
    #[serde(default)]
    pub environment: VariableMap,
    /// Active collection variables.
    #[serde(default)]
    pub collection_variables: VariableMap,
    /// Global variables.
    #[serde(default)]
    pub globals: VariableMap,
}

/// Result of a post-response run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostResponseOutput {
    /// Environment scope after the run.
    pub environment: VariableMap,
    /// Collection scope after the run.
    pub collection_variables: VariableMap,
    /// Global scope after the run.
    pub globals: VariableMap,
    /// Console output in call order.
    pub console_logs: Vec<ConsoleEntry>,
    /// Test results in call order.
    pub test_results: Vec<TestResult>,
    /// Wall-clock time of the run, rounded to two decimals.
    pub execution_time_ms: f64,
}

impl PostResponseOutput {
    /// Wraps the inputs unchanged, as returned for an empty script.
    #[must_use]
    pub fn unchanged(input: PostResponseInput) -> Self {
        Self {
            environment: input.environment,
            collection_variables: input.collection_variables,
            globals: input.globals,
            console_logs: Vec::new(),
            test_results: Vec::new(),
            execution_time_ms: 0.0,
        }
    }

    /// Returns true if every recorded test passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.test_results.iter().all(|t| t.passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_script_new() {
        let script = Script::new();
        assert!(script.is_empty());
        assert!(script.enabled);
        assert!(!script.should_run());
    }

    #[test]
    fn test_whitespace_script_is_empty() {
        assert!(Script::with_content("  \n\t ").is_empty());
    }

    #[test]
    fn test_script_disabled() {
        let mut script = Script::with_content("console.log('hello')");
        script.enabled = false;
        assert!(!script.should_run());
    }

    #[test]
    fn test_event_names() {
        assert_eq!(ScriptMode::PreRequest.event_name(), "prerequest");
        assert_eq!(ScriptMode::PostResponse.event_name(), "test");
    }

    #[test]
    fn test_console_level_mapping() {
        assert_eq!(ConsoleLevel::from_method("log"), ConsoleLevel::Info);
        assert_eq!(ConsoleLevel::from_method("debug"), ConsoleLevel::Info);
        assert_eq!(ConsoleLevel::from_method("warn"), ConsoleLevel::Warning);
        assert_eq!(ConsoleLevel::from_method("error"), ConsoleLevel::Error);
        assert_eq!(ConsoleLevel::Warning.as_str(), "warning");
    }

    #[test]
    fn test_unchanged_pre_request_output() {
        let mut input = PreRequestInput {
            request: RequestDescriptor::new("post", "https://x.test").with_body("{}"),
            ..PreRequestInput::default()
        };
        input.environment.insert("k".into(), "v".into());

        let output = PreRequestOutput::unchanged(input.clone());
        assert_eq!(output.request(), input.request);
        assert_eq!(output.environment, input.environment);
        assert!(output.console_logs.is_empty());
        assert!(output.execution_time_ms.abs() < f64::EPSILON);
    }

    #[test]
    fn test_request_scripts_with_pre_request() {
        let scripts =
            RequestScripts::new().with_pre_request(Script::with_content("console.log('pre')"));
        assert!(!scripts.is_empty());
        assert!(scripts.post_response.is_empty());
    }

    #[test]
    fn test_all_passed() {
        let mut output = PostResponseOutput::unchanged(PostResponseInput {
            response: ResponseDescriptor::new(200, "", 1.0),
            environment: VariableMap::new(),
            collection_variables: VariableMap::new(),
            globals: VariableMap::new(),
        });
        output.test_results.push(TestResult::passed("a"));
        assert!(output.all_passed());
        output.test_results.push(TestResult::failed("b", "boom"));
        assert!(!output.all_passed());
    }
}
