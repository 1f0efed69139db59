//! Script runner port
//!
//! Implemented by the sandboxed script engine. Futures are not `Send`: a
//! JavaScript runtime is bound to the thread that created it.

use async_trait::async_trait;
use vortex_domain::{PostResponseInput, PostResponseOutput, PreRequestInput, PreRequestOutput, Script};

use crate::error::ScriptError;

/// Runs pre-request and post-response scripts.
#[async_trait(?Send)]
pub trait ScriptRunner {
    /// Runs a pre-request script against the request and scopes.
    ///
    /// # Errors
    /// Returns [`ScriptError::Timeout`] when a resource ceiling is hit and
    /// [`ScriptError::Execution`] for any other uncaught failure.
    async fn run_pre_request(
        &self,
        script: &Script,
        input: PreRequestInput,
    ) -> Result<PreRequestOutput, ScriptError>;

    /// Runs a post-response script against the response and scopes.
    ///
    /// # Errors
    /// Same as [`ScriptRunner::run_pre_request`].
    async fn run_post_response(
        &self,
        script: &Script,
        input: PostResponseInput,
    ) -> Result<PostResponseOutput, ScriptError>;
}
