//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the application core and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod environment_store;
mod http_executor;
mod script_runner;

pub use environment_store::{EnvironmentStore, EnvironmentStoreError};
pub use http_executor::{HttpExecutor, HttpExecutorError};
pub use script_runner::ScriptRunner;
