//! Command implementations behind the `vortex-script` binary.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::info;
use vortex_application::ScriptError;
use vortex_application::ports::{HttpExecutor, HttpExecutorError};
use vortex_application::variable_resolver::{VariableResolver, VariableScopes};
use vortex_domain::{PostResponseInput, PreRequestInput, Script, ScriptMode, VariableMap};
use vortex_infrastructure::QuickJsScriptEngine;

use crate::settings::SettingsLoadError;

/// Exit status for a script that hit its time or memory budget.
pub const EXIT_TIMEOUT: u8 = 2;
/// Exit status for every other failure.
pub const EXIT_FAILURE: u8 = 1;

/// Errors surfaced by the binary.
#[derive(Debug, Error)]
pub enum RunError {
    /// A file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The input document did not match the expected shape.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] serde_json::Error),

    /// Settings could not be loaded.
    #[error(transparent)]
    Settings(#[from] SettingsLoadError),

    /// The HTTP client could not be built.
    #[error(transparent)]
    Http(#[from] HttpExecutorError),

    /// The script failed.
    #[error(transparent)]
    Script(#[from] ScriptError),
}

impl RunError {
    /// Process exit status for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Script(e) if e.is_timeout() => EXIT_TIMEOUT,
            _ => EXIT_FAILURE,
        }
    }

    /// JSON document describing the failure, console output included.
    #[must_use]
    pub fn report(&self) -> Value {
        match self {
            Self::Script(error) => json!({
                "error": if error.is_timeout() { "timeout" } else { "execution" },
                "message": error.to_string(),
                "console_logs": error.console_logs(),
            }),
            other => json!({
                "error": "invalid_invocation",
                "message": other.to_string(),
            }),
        }
    }
}

/// Runs `script` in `mode` against the JSON `input` and returns the result
/// document.
///
/// # Errors
///
/// Returns [`RunError::InvalidInput`] when `input` does not match the mode's
/// input shape and [`RunError::Script`] when the script fails.
pub async fn run_script<H: HttpExecutor>(
    engine: &QuickJsScriptEngine<H>,
    mode: ScriptMode,
    script: &str,
    input: &str,
) -> Result<Value, RunError> {
    let script = Script::with_content(script);
    let output = match mode {
        ScriptMode::PreRequest => {
            let input: PreRequestInput = serde_json::from_str(input)?;
            serde_json::to_value(engine.execute_pre_request(&script, input).await?)?
        }
        ScriptMode::PostResponse => {
            let input: PostResponseInput = serde_json::from_str(input)?;
            let output = engine.execute_post_response(&script, input).await?;
            info!(
                tests = output.test_results.len(),
                passed = output.all_passed(),
                "post-response script finished"
            );
            serde_json::to_value(output)?
        }
    };
    Ok(output)
}

/// Scopes for the `substitute` command. Missing scopes are empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubstituteInput {
    /// Environment variables.
    pub environment: VariableMap,
    /// Collection variables.
    pub collection_variables: VariableMap,
    /// Variables extracted from earlier responses.
    pub extracted: VariableMap,
}

/// Result of the `substitute` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubstituteOutput {
    /// The substituted text.
    pub text: String,
    /// References left as written.
    pub unresolved: Vec<String>,
}

/// Substitutes `template` against the scopes in the JSON `input`.
///
/// # Errors
///
/// Returns [`RunError::InvalidInput`] when `input` is not a scope document.
pub fn substitute(template: &str, input: &str, max_depth: usize) -> Result<SubstituteOutput, RunError> {
    let scopes: SubstituteInput = if input.trim().is_empty() {
        SubstituteInput::default()
    } else {
        serde_json::from_str(input)?
    };
    let result = VariableResolver::new(VariableScopes::request(
        &scopes.environment,
        &scopes.collection_variables,
        &scopes.extracted,
    ))
    .with_max_depth(max_depth)
    .substitute(template);
    Ok(SubstituteOutput {
        text: result.text,
        unresolved: result.unresolved,
    })
}
