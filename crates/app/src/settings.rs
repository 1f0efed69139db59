//! Layered engine settings.
//!
//! Sources, lowest priority first: built-in defaults, the settings file
//! (`--config` or `<config dir>/vortex/script.toml`), then `VORTEX_SCRIPT_*`
//! environment variables.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use thiserror::Error;
use tracing::debug;
use vortex_domain::{ScriptSettings, SettingsError};

/// Prefix of the environment variables that override settings.
pub const ENV_PREFIX: &str = "VORTEX_SCRIPT";

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum SettingsLoadError {
    /// A source could not be read or did not deserialize.
    #[error("failed to load settings: {0}")]
    Config(#[from] config::ConfigError),

    /// The merged settings are out of range.
    #[error("invalid settings: {0}")]
    Invalid(#[from] SettingsError),
}

/// The settings file consulted when no explicit path is given.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("vortex").join("script.toml"))
}

/// Builds [`ScriptSettings`] from the layered sources.
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    file: Option<PathBuf>,
    user_config: bool,
    env: Option<config::Map<String, String>>,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsLoader {
    /// Loader reading the user config file and the process environment.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            file: None,
            user_config: true,
            env: None,
        }
    }

    /// Reads this file instead of the user config file. The file must exist.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Skips the user config file.
    #[must_use]
    pub const fn without_user_config(mut self) -> Self {
        self.user_config = false;
        self
    }

    /// Reads overrides from `vars` instead of the process environment.
    #[must_use]
    pub fn with_env(mut self, vars: config::Map<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    /// Merges the sources and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing or malformed, a value
    /// has the wrong type, or the merged settings fail validation.
    pub fn load(&self) -> Result<ScriptSettings, SettingsLoadError> {
        let mut builder = Config::builder().add_source(Config::try_from(&ScriptSettings::default())?);

        if let Some(path) = &self.file {
            debug!(path = %path.display(), "reading settings file");
            builder = builder.add_source(File::from(path.as_path()).required(true));
        } else if self.user_config
            && let Some(path) = default_config_path()
        {
            debug!(path = %path.display(), "reading user settings file if present");
            builder = builder.add_source(File::from(path).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(self.env.clone()),
        );

        let settings: ScriptSettings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Loads settings from `path`, or from the user config file when `None`.
///
/// # Errors
///
/// See [`SettingsLoader::load`].
pub fn load_settings(path: Option<&Path>) -> Result<ScriptSettings, SettingsLoadError> {
    match path {
        Some(path) => SettingsLoader::new().with_file(path).load(),
        None => SettingsLoader::new().load(),
    }
}

/// Applies a command-line wall-clock budget to loaded settings. The outbound
/// timeout is capped so it still fits the new budget.
///
/// # Errors
///
/// Returns [`SettingsLoadError::Invalid`] if the result fails validation.
pub fn apply_timeout_override(
    settings: ScriptSettings,
    timeout_ms: Option<u64>,
) -> Result<ScriptSettings, SettingsLoadError> {
    let Some(ms) = timeout_ms else {
        return Ok(settings);
    };
    let settings = ScriptSettings {
        outbound_timeout_ms: settings.outbound_timeout_ms.min(ms),
        ..settings.with_timeout_ms(ms)
    };
    settings.validate()?;
    Ok(settings)
}
