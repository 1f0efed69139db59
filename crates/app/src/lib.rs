//! Vortex Script - command-line front end
//!
//! Loads layered [`vortex_domain::ScriptSettings`] and runs pre-request or
//! post-response scripts through the QuickJS engine.

pub mod runner;
pub mod settings;

pub use runner::{RunError, run_script, substitute};
pub use settings::{SettingsLoadError, SettingsLoader, apply_timeout_override, load_settings};
