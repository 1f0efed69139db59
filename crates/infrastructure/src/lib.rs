//! Vortex Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer: the QuickJS script engine and the
//! reqwest HTTP executor.

pub mod adapters;
pub mod scripting;

pub use adapters::ReqwestHttpExecutor;
pub use scripting::QuickJsScriptEngine;
