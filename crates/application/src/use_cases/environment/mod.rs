//! Environment use cases

mod manager;

pub use manager::{EnvironmentManager, RequestTemplate};
