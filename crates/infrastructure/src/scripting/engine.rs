//! Script engine: one sandbox per invocation, then a FIFO drain of the
//! `pm.sendRequest` calls the script queued.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};
use vortex_application::ScriptError;
use vortex_application::ports::{HttpExecutor, ScriptRunner};
use vortex_domain::{
    OutboundRequest, PostResponseInput, PostResponseOutput, PreRequestInput, PreRequestOutput,
    ResponseDescriptor, Script, ScriptSettings,
};

use super::bindings::SharedContext;
use super::context::ScriptContext;
use super::host::ResponseView;
use super::sandbox::{Failure, Sandbox};

/// What a drained callback receives: `(error, response JSON)`.
type Delivery = (Option<String>, Option<String>);

/// Runs `pm` scripts on an embedded QuickJS runtime.
#[derive(Debug)]
pub struct QuickJsScriptEngine<H> {
    http: Arc<H>,
    settings: ScriptSettings,
}

impl<H: HttpExecutor> QuickJsScriptEngine<H> {
    /// Creates an engine that sends `pm.sendRequest` calls through `http`.
    #[must_use]
    pub const fn new(http: Arc<H>, settings: ScriptSettings) -> Self {
        Self { http, settings }
    }

    /// Limits applied to every invocation.
    #[must_use]
    pub const fn settings(&self) -> &ScriptSettings {
        &self.settings
    }

    /// Runs a pre-request script. Disabled or blank scripts return the input
    /// unchanged with zero execution time.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Timeout`] when a ceiling is hit and
    /// [`ScriptError::Execution`] for any other uncaught failure.
    pub async fn execute_pre_request(
        &self,
        script: &Script,
        input: PreRequestInput,
    ) -> Result<PreRequestOutput, ScriptError> {
        if !script.should_run() {
            debug!("pre-request script empty or disabled, skipping");
            return Ok(PreRequestOutput::unchanged(input));
        }
        let context = ScriptContext::pre_request(input, self.settings.max_nesting_depth);
        let (context, elapsed) = self.run(&script.content, context).await?;
        Ok(context.into_pre_request_output(elapsed))
    }

    /// Runs a post-response script.
    ///
    /// # Errors
    ///
    /// Same as [`QuickJsScriptEngine::execute_pre_request`].
    pub async fn execute_post_response(
        &self,
        script: &Script,
        input: PostResponseInput,
    ) -> Result<PostResponseOutput, ScriptError> {
        if !script.should_run() {
            debug!("post-response script empty or disabled, skipping");
            return Ok(PostResponseOutput::unchanged(input));
        }
        let context = ScriptContext::post_response(input, self.settings.max_nesting_depth);
        let (context, elapsed) = self.run(&script.content, context).await?;
        Ok(context.into_post_response_output(elapsed))
    }

    async fn run(
        &self,
        source: &str,
        context: ScriptContext,
    ) -> Result<(ScriptContext, f64), ScriptError> {
        let started = Instant::now();
        let deadline = started + self.settings.timeout();
        let mode = context.mode;
        let state: SharedContext = Rc::new(RefCell::new(context));

        let outcome = self.drive(source, &state, deadline).await;
        let elapsed = round_ms(started.elapsed());
        let context = state.take();

        match outcome {
            Ok(()) => {
                debug!(
                    event = mode.event_name(),
                    elapsed_ms = elapsed,
                    tests = context.tests.len(),
                    "script finished"
                );
                Ok((context, elapsed))
            }
            Err(failure) => {
                debug!(event = mode.event_name(), ?failure, "script failed");
                Err(failure.into_script_error(context.console))
            }
        }
    }

    async fn drive(
        &self,
        source: &str,
        state: &SharedContext,
        deadline: Instant,
    ) -> Result<(), Failure> {
        let sandbox = Sandbox::new(&self.settings, deadline)?;
        sandbox.install(state)?;
        debug!("script context built");

        sandbox.eval(source)?;
        sandbox.run_pending_jobs()?;
        debug!(queued = state.borrow().pending.len(), "script evaluated");

        let mut drained = 0usize;
        loop {
            let next = state.borrow_mut().pending.pop_front();
            let Some(pending) = next else {
                break;
            };
            drained += 1;

            let (error, response) = if drained > self.settings.max_outbound_requests {
                (
                    Some(format!(
                        "sendRequest limit of {} reached",
                        self.settings.max_outbound_requests
                    )),
                    None,
                )
            } else {
                self.send(&pending.request, deadline).await?
            };

            match sandbox.dispatch(pending.id, error, response) {
                Ok(()) => {}
                Err(failure) if failure.is_resource_limit() => return Err(failure),
                Err(failure) => {
                    warn!(id = pending.id, ?failure, "sendRequest callback threw; ignoring");
                }
            }
            sandbox.run_pending_jobs()?;
        }
        Ok(())
    }

    /// Executes one queued request under `min(outbound timeout, time left)`.
    async fn send(&self, request: &OutboundRequest, deadline: Instant) -> Result<Delivery, Failure> {
        if let Err(e) = request.parse_url() {
            return Ok((Some(e.to_string()), None));
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Failure::Interrupted);
        }
        let budget = self.settings.outbound_timeout().min(remaining);

        debug!(method = %request.method, url = %request.url, "draining sendRequest");
        match tokio::time::timeout(budget, self.http.execute(request)).await {
            Ok(Ok(response)) => {
                let descriptor = ResponseDescriptor::from(&response);
                let mut payload = ResponseView::new(&descriptor).to_json();
                payload["responseSize"] = response.size.into();
                Ok((None, Some(payload.to_string())))
            }
            Ok(Err(e)) => Ok((Some(e.to_string()), None)),
            Err(_) if budget >= remaining => Err(Failure::Interrupted),
            Err(_) => Ok((
                Some(format!("request timed out after {}ms", budget.as_millis())),
                None,
            )),
        }
    }
}

#[async_trait(?Send)]
impl<H: HttpExecutor> ScriptRunner for QuickJsScriptEngine<H> {
    async fn run_pre_request(
        &self,
        script: &Script,
        input: PreRequestInput,
    ) -> Result<PreRequestOutput, ScriptError> {
        self.execute_pre_request(script, input).await
    }

    async fn run_post_response(
        &self,
        script: &Script,
        input: PostResponseInput,
    ) -> Result<PostResponseOutput, ScriptError> {
        self.execute_post_response(script, input).await
    }
}

/// Milliseconds rounded to two decimals.
fn round_ms(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100_000.0).round() / 100.0
}
