//! Application error types

use std::fmt;

use thiserror::Error;
use vortex_domain::{ConsoleEntry, DomainError, SettingsError};

use crate::ports::{EnvironmentStoreError, HttpExecutorError};

/// Which sandbox ceiling a timed-out script hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceLimit {
    /// The wall-clock budget.
    WallClock,
    /// The heap ceiling.
    Memory,
}

impl fmt::Display for ResourceLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WallClock => write!(f, "wall-clock limit"),
            Self::Memory => write!(f, "memory limit"),
        }
    }
}

/// A failed script invocation. No variable state is written back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// The script exceeded its wall-clock or memory budget.
    #[error("script timed out ({limit})")]
    Timeout {
        /// The ceiling that was hit.
        limit: ResourceLimit,
        /// Console output captured before the failure.
        console_logs: Vec<ConsoleEntry>,
    },

    /// The script threw, failed to parse, or required an unknown module.
    #[error("script execution failed: {message}")]
    Execution {
        /// Message of the uncaught error.
        message: String,
        /// Console output captured before the failure.
        console_logs: Vec<ConsoleEntry>,
    },
}

impl ScriptError {
    /// Execution error without console output.
    #[must_use]
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            console_logs: Vec::new(),
        }
    }

    /// Whether this is the timeout kind.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Console output captured before the failure.
    #[must_use]
    pub fn console_logs(&self) -> &[ConsoleEntry] {
        match self {
            Self::Timeout { console_logs, .. } | Self::Execution { console_logs, .. } => {
                console_logs
            }
        }
    }
}

/// Application-level errors.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// A domain validation error occurred.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// Engine settings were rejected.
    #[error("invalid settings: {0}")]
    Settings(#[from] SettingsError),

    /// The HTTP collaborator failed.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpExecutorError),

    /// The environment store failed.
    #[error("storage error: {0}")]
    Storage(#[from] EnvironmentStoreError),

    /// A pre-request or post-response script failed.
    #[error(transparent)]
    Script(#[from] ScriptError),
}

/// Result type alias for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use vortex_domain::ConsoleLevel;

    #[test]
    fn test_timeout_is_distinguishable() {
        let timeout = ScriptError::Timeout {
            limit: ResourceLimit::WallClock,
            console_logs: vec![ConsoleEntry::new(ConsoleLevel::Info, "started")],
        };
        assert!(timeout.is_timeout());
        assert_eq!(timeout.console_logs().len(), 1);
        assert_eq!(timeout.to_string(), "script timed out (wall-clock limit)");

        let failed = ScriptError::execution("boom");
        assert!(!failed.is_timeout());
        assert_eq!(failed.to_string(), "script execution failed: boom");
    }

    #[test]
    fn test_script_error_converts() {
        let err: ApplicationError = ScriptError::execution("x").into();
        assert!(matches!(err, ApplicationError::Script(_)));
    }
}
