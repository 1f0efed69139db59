//! Vortex Domain - Core business types
//!
//! This crate defines the domain model for the Vortex script engine:
//! variable scopes, request/response descriptors, script results and settings.
//! All types here are pure Rust with no I/O dependencies.

pub mod cookie;
pub mod environment;
pub mod error;
pub mod request;
pub mod response;
pub mod scripting;
pub mod settings;

pub use cookie::{Cookie, CookieJar, SameSite};
pub use environment::{Environment, VariableMap, VariableScope};
pub use error::{DomainError, DomainResult};
pub use request::{HeaderMap, OutboundRequest, RequestDescriptor};
pub use response::{HttpResponse, ResponseDescriptor, StatusCode};
pub use scripting::{
    ConsoleEntry, ConsoleLevel, PostResponseInput, PostResponseOutput, PreRequestInput,
    PreRequestOutput, RequestScripts, Script, ScriptMode, TestResult,
};
pub use settings::{ScriptSettings, SettingsError};
