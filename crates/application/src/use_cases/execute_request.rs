//! Execute Request Use Case
//!
//! One request lifecycle: pre-request script, substitution, the HTTP call,
//! then the post-response script. Scope writes of the first script are
//! visible to the second.

use std::sync::Arc;

use tracing::debug;
use vortex_domain::{
    HttpResponse, PostResponseInput, PostResponseOutput, PreRequestInput, PreRequestOutput,
    RequestDescriptor, RequestScripts, ResponseDescriptor, VariableMap,
};

use crate::error::ApplicationResult;
use crate::ports::{HttpExecutor, ScriptRunner};
use crate::use_cases::environment::{EnvironmentManager, RequestTemplate};

/// What the caller supplies for one request.
#[derive(Debug, Clone, Default)]
pub struct ExecuteRequestInput {
    /// The request as authored, placeholders included.
    pub request: RequestDescriptor,
    /// Scripts attached to the request.
    pub scripts: RequestScripts,
    /// Collection variables.
    pub collection_variables: VariableMap,
    /// Global variables.
    pub globals: VariableMap,
    /// Optional bearer token, substituted like the other fields.
    pub auth_token: Option<String>,
}

/// Everything produced by one request lifecycle.
#[derive(Debug, Clone)]
pub struct ExecuteRequestOutput {
    /// The request that was actually sent.
    pub sent: RequestDescriptor,
    /// The response.
    pub response: HttpResponse,
    /// Result of the pre-request script.
    pub pre_request: PreRequestOutput,
    /// Result of the post-response script.
    pub post_response: PostResponseOutput,
    /// References left unresolved by substitution.
    pub unresolved: Vec<String>,
}

impl ExecuteRequestOutput {
    /// Collection variables after both scripts.
    #[must_use]
    pub const fn collection_variables(&self) -> &VariableMap {
        &self.post_response.collection_variables
    }

    /// Globals after both scripts.
    #[must_use]
    pub const fn globals(&self) -> &VariableMap {
        &self.post_response.globals
    }
}

/// Use case for running a request through the script pipeline.
///
/// # Example
///
/// ```ignore
/// let use_case = ExecuteRequest::new(Arc::new(ReqwestHttpExecutor::new()?), QuickJsScriptEngine::default());
/// let output = use_case.execute(&mut manager, input).await?;
/// ```
pub struct ExecuteRequest<H: HttpExecutor, R: ScriptRunner> {
    http: Arc<H>,
    runner: R,
}

impl<H: HttpExecutor, R: ScriptRunner> ExecuteRequest<H, R> {
    /// Creates the use case.
    pub const fn new(http: Arc<H>, runner: R) -> Self {
        Self { http, runner }
    }

    /// Runs the full lifecycle.
    ///
    /// Environment changes made by either script are applied to the
    /// manager's active environment (and written through to its store).
    ///
    /// # Errors
    ///
    /// Fails when a script fails, the request URL is invalid, the HTTP
    /// executor fails, or the environment write-through fails. A failed
    /// script leaves the environment untouched.
    pub async fn execute(
        &self,
        manager: &mut EnvironmentManager,
        input: ExecuteRequestInput,
    ) -> ApplicationResult<ExecuteRequestOutput> {
        let ExecuteRequestInput {
            request,
            scripts,
            collection_variables,
            globals,
            auth_token,
        } = input;

        let pre_request = self
            .runner
            .run_pre_request(
                &scripts.pre_request,
                PreRequestInput {
                    request,
                    environment: manager.variables().clone(),
                    collection_variables,
                    globals,
                },
            )
            .await?;
        manager.apply_variables(&pre_request.environment).await?;

        let template = RequestTemplate {
            url: pre_request.url.clone(),
            params: pre_request.params.clone(),
            headers: pre_request.headers.clone(),
            body: Some(pre_request.body.clone()).filter(|b| !b.is_empty()),
            auth_token,
        };
        let (template, unresolved) =
            manager.substitute_in_request(&template, &pre_request.collection_variables);
        if !unresolved.is_empty() {
            debug!(?unresolved, "Sending request with unresolved variables");
        }

        let mut sent = RequestDescriptor {
            url: template.url,
            method: pre_request.method.clone(),
            headers: template.headers,
            body: template.body.unwrap_or_default(),
            params: template.params,
        };
        if let Some(token) = template.auth_token.filter(|t| !t.is_empty())
            && !sent.headers.contains("authorization")
        {
            sent.headers.upsert("Authorization", format!("Bearer {token}"));
        }

        let outbound = sent.to_outbound()?;
        debug!(method = %outbound.method, url = %outbound.url, "Executing request");
        let response = self.http.execute(&outbound).await?;

        let post_response = self
            .runner
            .run_post_response(
                &scripts.post_response,
                PostResponseInput {
                    response: ResponseDescriptor::from(&response),
                    environment: manager.variables().clone(),
                    collection_variables: pre_request.collection_variables.clone(),
                    globals: pre_request.globals.clone(),
                },
            )
            .await?;
        manager.apply_variables(&post_response.environment).await?;

        Ok(ExecuteRequestOutput {
            sent,
            response,
            pre_request,
            post_response,
            unresolved,
        })
    }
}
