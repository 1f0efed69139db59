//! Environment store port
//!
//! Write-through target of the Environment Manager.

use async_trait::async_trait;

use vortex_domain::Environment;

/// Errors that can occur during environment persistence.
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentStoreError {
    /// Environment not found.
    #[error("Environment not found: {0}")]
    NotFound(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Persistence collaborator for environments.
#[async_trait]
pub trait EnvironmentStore: Send + Sync {
    /// Loads an environment by name.
    ///
    /// # Errors
    /// Returns `EnvironmentStoreError::NotFound` if the environment doesn't exist.
    async fn load(&self, name: &str) -> Result<Environment, EnvironmentStoreError>;

    /// Persists the full environment, replacing any stored copy.
    ///
    /// # Errors
    /// Returns an error if the environment cannot be written.
    async fn save(&self, environment: &Environment) -> Result<(), EnvironmentStoreError>;
}
