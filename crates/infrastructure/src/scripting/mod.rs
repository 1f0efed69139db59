//! Sandboxed `pm` script engine on an embedded QuickJS runtime.
//!
//! Each invocation builds a fresh [`ScriptContext`] from the caller's scopes,
//! installs the host capabilities into a new sandbox, evaluates the script,
//! then drains queued `pm.sendRequest` calls in FIFO order before packaging
//! the result.

pub mod assertions;
mod bindings;
pub mod context;
mod engine;
pub mod host;
pub mod modules;
mod sandbox;

pub use context::{PendingRequest, ScriptContext};
pub use engine::QuickJsScriptEngine;
pub use sandbox::Failure;
