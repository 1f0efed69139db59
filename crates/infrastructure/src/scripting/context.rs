//! Script execution context
//!
//! One per invocation: copies of the variable scopes, the request or
//! response descriptor, and the append-only logs the script produces.

use std::collections::VecDeque;

use uuid::Uuid;
use vortex_domain::{
    ConsoleEntry, CookieJar, OutboundRequest, PostResponseInput, PostResponseOutput,
    PreRequestInput, PreRequestOutput, RequestDescriptor, ResponseDescriptor, ScriptMode,
    TestResult, VariableMap,
};

/// A `pm.sendRequest` call waiting for the drain phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    /// Id returned to the script; keys the stored callback.
    pub id: u32,
    /// The request to issue.
    pub request: OutboundRequest,
}

/// State shared between the engine and the host functions of one run.
#[derive(Debug, Default)]
pub struct ScriptContext {
    /// Which entry point is running.
    pub mode: ScriptMode,
    /// Environment scope.
    pub environment: VariableMap,
    /// Collection scope.
    pub collection: VariableMap,
    /// Global scope.
    pub globals: VariableMap,
    /// Script-local scratch scope, never returned.
    pub local: VariableMap,
    /// Mutable request (pre-request mode).
    pub request: RequestDescriptor,
    /// Read-only response (post-response mode).
    pub response: Option<ResponseDescriptor>,
    /// Per-invocation cookie jar.
    pub cookies: CookieJar,
    /// Console output.
    pub console: Vec<ConsoleEntry>,
    /// Test results.
    pub tests: Vec<TestResult>,
    /// Queued outbound requests, FIFO.
    pub pending: VecDeque<PendingRequest>,
    /// Value of `pm.info.requestId`.
    pub request_id: String,
    /// Bound for nested resolution in `replaceIn`.
    pub max_depth: usize,
    next_pending_id: u32,
}

impl ScriptContext {
    /// Context for a pre-request run.
    #[must_use]
    pub fn pre_request(input: PreRequestInput, max_depth: usize) -> Self {
        Self {
            mode: ScriptMode::PreRequest,
            environment: input.environment,
            collection: input.collection_variables,
            globals: input.globals,
            request: input.request,
            request_id: Uuid::new_v4().to_string(),
            max_depth,
            ..Self::default()
        }
    }

    /// Context for a post-response run. The cookie jar is seeded from the
    /// response `Set-Cookie` header.
    #[must_use]
    pub fn post_response(input: PostResponseInput, max_depth: usize) -> Self {
        let cookies =
            CookieJar::from_set_cookie_headers(input.response.headers.get("set-cookie"), "");
        Self {
            mode: ScriptMode::PostResponse,
            environment: input.environment,
            collection: input.collection_variables,
            globals: input.globals,
            response: Some(input.response),
            cookies,
            request_id: Uuid::new_v4().to_string(),
            max_depth,
            ..Self::default()
        }
    }

    /// Queues an outbound request and returns its id.
    pub fn enqueue(&mut self, mut request: OutboundRequest) -> u32 {
        if !request.headers.contains("cookie")
            && let Some(header) = request
                .host()
                .and_then(|host| self.cookies.cookie_header(&host))
        {
            request.headers.upsert("Cookie", header);
        }
        self.next_pending_id += 1;
        let id = self.next_pending_id;
        self.pending.push_back(PendingRequest { id, request });
        id
    }

    /// Packages a finished pre-request run.
    #[must_use]
    pub fn into_pre_request_output(self, execution_time_ms: f64) -> PreRequestOutput {
        PreRequestOutput {
            url: self.request.url,
            method: self.request.method,
            headers: self.request.headers,
            body: self.request.body,
            params: self.request.params,
            environment: self.environment,
            collection_variables: self.collection,
            globals: self.globals,
            console_logs: self.console,
            execution_time_ms,
        }
    }

    /// Packages a finished post-response run.
    #[must_use]
    pub fn into_post_response_output(self, execution_time_ms: f64) -> PostResponseOutput {
        PostResponseOutput {
            environment: self.environment,
            collection_variables: self.collection,
            globals: self.globals,
            console_logs: self.console,
            test_results: self.tests,
            execution_time_ms,
        }
    }
}
