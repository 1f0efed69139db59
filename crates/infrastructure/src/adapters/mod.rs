//! Adapters implementing the application ports.

mod reqwest_client;

pub use reqwest_client::ReqwestHttpExecutor;
