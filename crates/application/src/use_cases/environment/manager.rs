//! Environment Manager
//!
//! Wraps the active environment, writes variable changes through to an
//! optional store and applies substitution to request fields.

use std::sync::Arc;

use tracing::{debug, info};
use vortex_domain::{Environment, HeaderMap, VariableMap};

use crate::ports::{EnvironmentStore, EnvironmentStoreError};
use crate::variable_resolver::{
    DEFAULT_MAX_DEPTH, VariableResolver, VariableScopes, merge_unresolved,
};

static NO_VARIABLES: VariableMap = VariableMap::new();

/// The request fields the manager substitutes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestTemplate {
    /// Target URL.
    pub url: String,
    /// Query parameters.
    pub params: VariableMap,
    /// Request headers.
    pub headers: HeaderMap,
    /// Optional body.
    pub body: Option<String>,
    /// Optional bearer token.
    pub auth_token: Option<String>,
}

/// Holds the active environment and the session's extracted variables.
pub struct EnvironmentManager {
    active: Option<Environment>,
    extracted: VariableMap,
    store: Option<Arc<dyn EnvironmentStore>>,
    max_depth: usize,
}

impl std::fmt::Debug for EnvironmentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentManager")
            .field("active", &self.active.as_ref().map(|e| &e.name))
            .field("extracted", &self.extracted.len())
            .field("store", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for EnvironmentManager {
    fn default() -> Self {
        Self {
            active: None,
            extracted: VariableMap::new(),
            store: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EnvironmentManager {
    /// Creates a manager with no active environment and no store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a write-through store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn EnvironmentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the nesting bound used by [`Self::substitute_in_request`].
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Makes `environment` the active one.
    pub fn set_active(&mut self, environment: Environment) {
        info!(
            environment = %environment.name,
            variables = environment.variable_count(),
            "Active environment changed"
        );
        self.active = Some(environment);
    }

    /// Loads an environment from the store and makes it active.
    ///
    /// # Errors
    /// Returns `NotFound` when no store is attached or the store has no such
    /// environment.
    pub async fn activate(&mut self, name: &str) -> Result<(), EnvironmentStoreError> {
        let Some(store) = &self.store else {
            return Err(EnvironmentStoreError::NotFound(name.to_string()));
        };
        let environment = store.load(name).await?;
        self.set_active(environment);
        Ok(())
    }

    /// Drops the active environment.
    pub fn clear_active(&mut self) {
        if let Some(previous) = self.active.take() {
            info!(environment = %previous.name, "Active environment cleared");
        }
    }

    /// The active environment, if any.
    #[must_use]
    pub const fn active(&self) -> Option<&Environment> {
        self.active.as_ref()
    }

    /// Variables of the active environment; empty when none is active.
    #[must_use]
    pub fn variables(&self) -> &VariableMap {
        self.active.as_ref().map_or(&NO_VARIABLES, |e| &e.variables)
    }

    /// Variables extracted from earlier responses.
    #[must_use]
    pub const fn extracted(&self) -> &VariableMap {
        &self.extracted
    }

    /// Records an extracted variable for this session.
    pub fn set_extracted(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extracted.insert(key.into(), value.into());
    }

    /// Sets a variable on the active environment and writes it through.
    ///
    /// Does nothing when no environment is active.
    ///
    /// # Errors
    /// Returns the store error if the write-through fails. The in-memory
    /// value is kept either way.
    pub async fn set_variable(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), EnvironmentStoreError> {
        let Some(environment) = self.active.as_mut() else {
            debug!("set_variable ignored: no active environment");
            return Ok(());
        };
        environment.set_variable(key, value);
        self.persist().await
    }

    /// Removes a variable from the active environment and writes it through.
    ///
    /// # Errors
    /// Returns the store error if the write-through fails.
    pub async fn unset_variable(&mut self, key: &str) -> Result<(), EnvironmentStoreError> {
        let Some(environment) = self.active.as_mut() else {
            return Ok(());
        };
        if environment.remove_variable(key).is_none() {
            return Ok(());
        }
        self.persist().await
    }

    /// Replaces the active environment's variables with `variables`,
    /// writing through once if anything changed.
    ///
    /// # Errors
    /// Returns the store error if the write-through fails.
    pub async fn apply_variables(
        &mut self,
        variables: &VariableMap,
    ) -> Result<bool, EnvironmentStoreError> {
        let Some(environment) = self.active.as_mut() else {
            return Ok(false);
        };
        if &environment.variables == variables {
            return Ok(false);
        }
        environment.variables.clone_from(variables);
        self.persist().await?;
        Ok(true)
    }

    async fn persist(&self) -> Result<(), EnvironmentStoreError> {
        match (&self.store, &self.active) {
            (Some(store), Some(environment)) => store.save(environment).await,
            _ => Ok(()),
        }
    }

    /// Substitutes the URL, params, headers, body and auth token of a request.
    ///
    /// Lookups use extracted, then collection, then environment variables.
    /// The unresolved lists of the five fields are merged without duplicates.
    #[must_use]
    pub fn substitute_in_request(
        &self,
        request: &RequestTemplate,
        collection_variables: &VariableMap,
    ) -> (RequestTemplate, Vec<String>) {
        let resolver = VariableResolver::new(VariableScopes::request(
            self.variables(),
            collection_variables,
            &self.extracted,
        ))
        .with_max_depth(self.max_depth);

        let mut unresolved = Vec::new();

        let url = resolver.substitute(&request.url);
        merge_unresolved(&mut unresolved, url.unresolved);

        let (params, missing) = resolver.substitute_map(&request.params);
        merge_unresolved(&mut unresolved, missing);

        let (headers, missing) = resolver.substitute_map(&request.headers.to_map());
        merge_unresolved(&mut unresolved, missing);

        let body = request.body.as_deref().map(|body| {
            let result = resolver.substitute(body);
            merge_unresolved(&mut unresolved, result.unresolved);
            result.text
        });

        let auth_token = request.auth_token.as_deref().map(|token| {
            let result = resolver.substitute(token);
            merge_unresolved(&mut unresolved, result.unresolved);
            result.text
        });

        let substituted = RequestTemplate {
            url: url.text,
            params,
            headers: headers.into_iter().collect(),
            body,
            auth_token,
        };
        (substituted, unresolved)
    }
}
