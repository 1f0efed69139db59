//! QuickJS runtime with the invocation's resource ceilings applied.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Instant;

use rquickjs::{CatchResultExt, CaughtError, Context, Ctx, Function, Persistent, Runtime, Value};
use tracing::warn;
use vortex_application::{ResourceLimit, ScriptError};
use vortex_domain::{ConsoleEntry, ScriptSettings};

use super::bindings::{self, SharedContext};

const PRELUDE: &str = include_str!("prelude.js");

/// Why a sandbox step did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The wall-clock deadline passed while script code was running.
    Interrupted,
    /// The heap ceiling was hit.
    OutOfMemory,
    /// Script code threw, or the engine rejected the source.
    Thrown(String),
}

impl Failure {
    /// Whether the failure is a resource ceiling rather than a script error.
    #[must_use]
    pub const fn is_resource_limit(&self) -> bool {
        matches!(self, Self::Interrupted | Self::OutOfMemory)
    }

    /// Converts into the caller-facing error, carrying the console output.
    #[must_use]
    pub fn into_script_error(self, console_logs: Vec<ConsoleEntry>) -> ScriptError {
        match self {
            Self::Interrupted => ScriptError::Timeout {
                limit: ResourceLimit::WallClock,
                console_logs,
            },
            Self::OutOfMemory => ScriptError::Timeout {
                limit: ResourceLimit::Memory,
                console_logs,
            },
            Self::Thrown(message) => ScriptError::Execution {
                message,
                console_logs,
            },
        }
    }
}

impl From<rquickjs::Error> for Failure {
    fn from(error: rquickjs::Error) -> Self {
        match error {
            rquickjs::Error::Allocation => Self::OutOfMemory,
            other => Self::Thrown(format!("script runtime error: {other}")),
        }
    }
}

/// One runtime and context per invocation.
pub struct Sandbox {
    // Declared first so it is released before the runtime.
    dispatcher: RefCell<Option<Persistent<Function<'static>>>>,
    context: Context,
    runtime: Runtime,
    interrupted: Rc<Cell<bool>>,
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox")
            .field("interrupted", &self.interrupted.get())
            .finish_non_exhaustive()
    }
}

impl Sandbox {
    /// Creates a runtime bounded by `settings` whose script code is
    /// interrupted once `deadline` passes.
    ///
    /// # Errors
    ///
    /// Returns a [`Failure`] if QuickJS cannot allocate the runtime.
    pub fn new(settings: &ScriptSettings, deadline: Instant) -> Result<Self, Failure> {
        let runtime = Runtime::new()?;
        runtime.set_memory_limit(settings.memory_limit_bytes);
        runtime.set_max_stack_size(settings.max_stack_bytes);

        let interrupted = Rc::new(Cell::new(false));
        let flag = Rc::clone(&interrupted);
        runtime.set_interrupt_handler(Some(Box::new(move || {
            if Instant::now() >= deadline {
                flag.set(true);
                true
            } else {
                false
            }
        })));

        let context = Context::full(&runtime)?;
        Ok(Self {
            dispatcher: RefCell::new(None),
            context,
            runtime,
            interrupted,
        })
    }

    /// Whether the deadline interrupted script code.
    #[must_use]
    pub fn was_interrupted(&self) -> bool {
        self.interrupted.get()
    }

    /// Installs the host functions and evaluates the prelude. The callback
    /// dispatcher the prelude returns is kept on the Rust side only.
    ///
    /// # Errors
    ///
    /// Returns a [`Failure`] if installation fails.
    pub fn install(&self, state: &SharedContext) -> Result<(), Failure> {
        self.context.with(|ctx| {
            bindings::install(&ctx, state)
                .catch(&ctx)
                .map_err(|e| self.classify(&ctx, e))?;
            let dispatcher: Function<'_> = ctx
                .eval(PRELUDE)
                .catch(&ctx)
                .map_err(|e| self.classify(&ctx, e))?;
            self.dispatcher
                .replace(Some(Persistent::save(&ctx, dispatcher)));
            Ok(())
        })
    }

    /// Runs the script body as global code.
    ///
    /// # Errors
    ///
    /// Returns a [`Failure`] if the script throws or a ceiling is hit.
    pub fn eval(&self, source: &str) -> Result<(), Failure> {
        self.context.with(|ctx| {
            ctx.eval::<Value, _>(source)
                .catch(&ctx)
                .map(drop)
                .map_err(|e| self.classify(&ctx, e))
        })
    }

    /// Invokes the stored `sendRequest` callback for `id`.
    ///
    /// # Errors
    ///
    /// Returns a [`Failure`] if the callback throws or a ceiling is hit.
    pub fn dispatch(
        &self,
        id: u32,
        error: Option<String>,
        response: Option<String>,
    ) -> Result<(), Failure> {
        let dispatcher = self
            .dispatcher
            .borrow()
            .clone()
            .ok_or_else(|| Failure::Thrown("sandbox prelude is not installed".to_string()))?;
        self.context.with(|ctx| {
            let dispatch = dispatcher
                .restore(&ctx)
                .catch(&ctx)
                .map_err(|e| self.classify(&ctx, e))?;
            dispatch
                .call::<_, Value<'_>>((id, error, response))
                .catch(&ctx)
                .map(drop)
                .map_err(|e| self.classify(&ctx, e))
        })
    }

    /// Runs queued promise jobs until none remain.
    ///
    /// # Errors
    ///
    /// Returns [`Failure::Interrupted`] if the deadline passes meanwhile.
    pub fn run_pending_jobs(&self) -> Result<(), Failure> {
        loop {
            match self.runtime.execute_pending_job() {
                Ok(true) => {}
                Ok(false) => return Ok(()),
                Err(_) if self.was_interrupted() => return Err(Failure::Interrupted),
                Err(error) => warn!(error = ?error, "promise job failed"),
            }
        }
    }

    fn classify<'js>(&self, ctx: &Ctx<'js>, error: CaughtError<'js>) -> Failure {
        if self.was_interrupted() {
            return Failure::Interrupted;
        }
        match error {
            CaughtError::Error(rquickjs::Error::Allocation) => Failure::OutOfMemory,
            CaughtError::Error(other) => Failure::Thrown(other.to_string()),
            CaughtError::Exception(exception) => {
                let message = exception.message().unwrap_or_default();
                if message.contains("out of memory") {
                    return Failure::OutOfMemory;
                }
                let name: Option<String> = exception.get("name").ok().flatten();
                Failure::Thrown(match name {
                    Some(name) if name != "Error" && !message.is_empty() => {
                        format!("{name}: {message}")
                    }
                    Some(name) if message.is_empty() => name,
                    _ => message,
                })
            }
            CaughtError::Value(value) => {
                let text = value
                    .as_string()
                    .and_then(|s| s.to_string().ok())
                    .or_else(|| {
                        ctx.json_stringify(value.clone())
                            .ok()
                            .flatten()
                            .and_then(|s| s.to_string().ok())
                    })
                    .unwrap_or_else(|| "uncaught exception".to_string());
                Failure::Thrown(text)
            }
        }
    }
}
