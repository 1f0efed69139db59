//! Variable scope and environment types
//!
//! Every scope stores plain strings. Script values written into any scope are
//! coerced to text before they land here.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A collection of variables keyed by name.
pub type VariableMap = BTreeMap<String, String>;

/// The origin of a variable value.
///
/// Unprefixed references in a script cascade `Local > Global > Collection >
/// Environment`; template substitution cascades `Extracted > Collection >
/// Environment`. `Dynamic` values never live in a map; they are generated per
/// reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableScope {
    /// Variables owned by the active environment.
    Environment,
    /// Variables owned by the active collection.
    Collection,
    /// Values extracted from earlier responses.
    Extracted,
    /// Globals visible to every script.
    Global,
    /// Script-local scratch values, never persisted.
    Local,
    /// Generated `$name` values.
    Dynamic,
}

impl VariableScope {
    /// Returns the template prefix tag for scopes that can be addressed
    /// explicitly (`{{env.x}}`, `{{col.x}}`, `{{ext.x}}`).
    #[must_use]
    pub const fn tag(self) -> Option<&'static str> {
        match self {
            Self::Environment => Some("env"),
            Self::Collection => Some("col"),
            Self::Extracted => Some("ext"),
            Self::Global | Self::Local | Self::Dynamic => None,
        }
    }

    /// Parses a template prefix tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "env" => Some(Self::Environment),
            "col" => Some(Self::Collection),
            "ext" => Some(Self::Extracted),
            _ => None,
        }
    }

    /// Returns the scope name used by the script host bridge.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::Collection => "collection",
            Self::Extracted => "extracted",
            Self::Global => "global",
            Self::Local => "local",
            Self::Dynamic => "dynamic",
        }
    }

    /// Parses a scope name produced by [`VariableScope::as_str`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "environment" => Some(Self::Environment),
            "collection" => Some(Self::Collection),
            "extracted" => Some(Self::Extracted),
            "global" => Some(Self::Global),
            "local" => Some(Self::Local),
            "dynamic" => Some(Self::Dynamic),
            _ => None,
        }
    }

    /// Returns a human-readable name for the scope.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Environment => "Environment",
            Self::Collection => "Collection",
            Self::Extracted => "Extracted",
            Self::Global => "Global",
            Self::Local => "Local",
            Self::Dynamic => "Dynamic",
        }
    }
}

impl fmt::Display for VariableScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// An environment containing a set of variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Unique identifier
    pub id: Uuid,
    /// Environment name (e.g., "Development", "Production")
    pub name: String,
    /// Variables in this environment.
    #[serde(default)]
    pub variables: VariableMap,
}

impl Environment {
    /// Creates a new environment with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            variables: VariableMap::new(),
        }
    }

    /// Creates an environment pre-populated with variables.
    #[must_use]
    pub fn with_variables(name: impl Into<String>, variables: VariableMap) -> Self {
        Self {
            variables,
            ..Self::new(name)
        }
    }

    /// Adds or updates a variable in this environment.
    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    /// Gets a variable value by name.
    #[must_use]
    pub fn get_variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Removes a variable by name.
    pub fn remove_variable(&mut self, name: &str) -> Option<String> {
        self.variables.remove(name)
    }

    /// Returns the number of variables in this environment.
    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new("New Environment")
    }
}
