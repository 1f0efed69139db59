//! Vortex Application - Use cases and ports
//!
//! This crate holds the engine-independent logic: dynamic variables, the
//! substitution engine, the Environment Manager, the request pipeline and the
//! ports implemented by the infrastructure layer.

pub mod error;
pub mod ports;
pub mod use_cases;
pub mod variable_resolver;

pub use error::{ApplicationError, ApplicationResult, ResourceLimit, ScriptError};
