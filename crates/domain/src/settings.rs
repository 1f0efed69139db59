//! Script engine settings.
//!
//! Resource limits and tunables for one script invocation. The binary layers
//! these from defaults, a config file and the environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A setting rejected by [`ScriptSettings::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// A limit that must be positive was zero.
    #[error("setting '{0}' must be greater than zero")]
    Zero(&'static str),

    /// The outbound timeout is longer than the whole script budget.
    #[error("outbound_timeout_ms ({outbound}) must not exceed timeout_ms ({total})")]
    OutboundExceedsTotal {
        /// Configured outbound timeout.
        outbound: u64,
        /// Configured script timeout.
        total: u64,
    },
}

/// Limits applied to each script invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSettings {
    /// Wall-clock budget for the script body, in milliseconds.
    pub timeout_ms: u64,
    /// Heap ceiling of the sandbox, in bytes.
    pub memory_limit_bytes: usize,
    /// Timeout for each outbound `sendRequest` call, in milliseconds.
    pub outbound_timeout_ms: u64,
    /// Maximum number of `sendRequest` calls executed per invocation.
    pub max_outbound_requests: usize,
    /// Bound for nested variable resolution.
    pub max_nesting_depth: usize,
    /// Native stack limit of the sandbox, in bytes.
    pub max_stack_bytes: usize,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            memory_limit_bytes: 50 * 1024 * 1024,
            outbound_timeout_ms: 4_000,
            max_outbound_requests: 32,
            max_nesting_depth: 10,
            max_stack_bytes: 1024 * 1024,
        }
    }
}

impl ScriptSettings {
    /// Script body budget.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Per-call outbound budget.
    #[must_use]
    pub const fn outbound_timeout(&self) -> Duration {
        Duration::from_millis(self.outbound_timeout_ms)
    }

    /// Sets the script timeout.
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Sets the memory ceiling.
    #[must_use]
    pub const fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit_bytes = bytes;
        self
    }

    /// Sets the outbound call cap.
    #[must_use]
    pub const fn with_max_outbound_requests(mut self, max: usize) -> Self {
        self.max_outbound_requests = max;
        self
    }

    /// Checks that every limit is usable.
    ///
    /// # Errors
    ///
    /// Returns the first offending setting.
    pub const fn validate(&self) -> Result<(), SettingsError> {
        if self.timeout_ms == 0 {
            return Err(SettingsError::Zero("timeout_ms"));
        }
        if self.memory_limit_bytes == 0 {
            return Err(SettingsError::Zero("memory_limit_bytes"));
        }
        if self.outbound_timeout_ms == 0 {
            return Err(SettingsError::Zero("outbound_timeout_ms"));
        }
        if self.max_nesting_depth == 0 {
            return Err(SettingsError::Zero("max_nesting_depth"));
        }
        if self.max_stack_bytes == 0 {
            return Err(SettingsError::Zero("max_stack_bytes"));
        }
        if self.outbound_timeout_ms > self.timeout_ms {
            return Err(SettingsError::OutboundExceedsTotal {
                outbound: self.outbound_timeout_ms,
                total: self.timeout_ms,
            });
        }
        Ok(())
    }
}
