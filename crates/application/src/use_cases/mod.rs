//! Application use cases (business logic orchestration).

pub mod environment;
mod execute_request;

pub use environment::{EnvironmentManager, RequestTemplate};
pub use execute_request::{ExecuteRequest, ExecuteRequestInput, ExecuteRequestOutput};
