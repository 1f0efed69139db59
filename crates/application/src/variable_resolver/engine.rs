//! Substitution engine
//!
//! Replaces `{{reference}}` tokens with values from an ordered list of
//! variable scopes, expanding references nested inside values.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use vortex_domain::{VariableMap, VariableScope};

use super::dynamic::DynamicVariables;
use super::parser::{REFERENCE, ReferenceKind, VariableReference};

/// Default bound for nested resolution.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Either a `{{...}}` token, skipped, or a bare `$name` (group 1).
#[allow(clippy::expect_used)]
static LEGACY_DYNAMIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{[^}]*\}\}|\$([A-Za-z_][A-Za-z0-9_]*)").expect("legacy pattern is valid")
});

/// Output of one substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    /// Text with every resolvable reference replaced.
    pub text: String,
    /// Unresolved tokens exactly as written (`{{missing}}`), without duplicates.
    pub unresolved: Vec<String>,
}

impl Substitution {
    /// Whether every reference resolved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Scopes consulted by the resolver, highest priority first.
#[derive(Debug, Clone, Default)]
pub struct VariableScopes<'a> {
    layers: Vec<(VariableScope, &'a VariableMap)>,
}

impl<'a> VariableScopes<'a> {
    /// An empty scope list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The request-time cascade: extracted, then collection, then environment.
    #[must_use]
    pub fn request(
        environment: &'a VariableMap,
        collection: &'a VariableMap,
        extracted: &'a VariableMap,
    ) -> Self {
        Self::new()
            .with(VariableScope::Extracted, extracted)
            .with(VariableScope::Collection, collection)
            .with(VariableScope::Environment, environment)
    }

    /// Appends a layer below the ones already present.
    #[must_use]
    pub fn with(mut self, scope: VariableScope, variables: &'a VariableMap) -> Self {
        self.layers.push((scope, variables));
        self
    }

    /// First hit walking the layers in priority order.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&'a str> {
        self.layers
            .iter()
            .find_map(|(_, vars)| vars.get(name).map(String::as_str))
    }

    /// Lookup confined to one scope.
    #[must_use]
    pub fn lookup_in(&self, scope: VariableScope, name: &str) -> Option<&'a str> {
        self.layers
            .iter()
            .filter(|(s, _)| *s == scope)
            .find_map(|(_, vars)| vars.get(name).map(String::as_str))
    }
}

/// Resolves references against a [`VariableScopes`] list.
#[derive(Debug, Clone)]
pub struct VariableResolver<'a> {
    scopes: VariableScopes<'a>,
    max_depth: usize,
}

impl<'a> VariableResolver<'a> {
    /// Creates a resolver with the default nesting bound.
    #[must_use]
    pub fn new(scopes: VariableScopes<'a>) -> Self {
        Self {
            scopes,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets the nesting bound.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Substitutes every reference in `text`.
    ///
    /// Values that themselves contain references are expanded recursively up
    /// to the nesting bound. Past the bound the remaining tokens are left in
    /// place and not reported as unresolved.
    #[must_use]
    pub fn substitute(&self, text: &str) -> Substitution {
        if text.is_empty() {
            return Substitution::default();
        }
        let mut unresolved = Vec::new();
        let text = self.expand(text, 0, &mut unresolved);
        Substitution { text, unresolved }
    }

    /// Substitutes keys and values of a map.
    #[must_use]
    pub fn substitute_map(&self, map: &VariableMap) -> (VariableMap, Vec<String>) {
        let mut unresolved = Vec::new();
        let out = map
            .iter()
            .map(|(k, v)| {
                let key = self.expand(k, 0, &mut unresolved);
                let value = self.expand(v, 0, &mut unresolved);
                (key, value)
            })
            .collect();
        (out, unresolved)
    }

    /// Expands bare `$name` dynamic references written in `text`, then
    /// substitutes. Resolved values are inserted verbatim.
    #[must_use]
    pub fn replace_in(&self, text: &str) -> String {
        self.substitute(&expand_legacy_dynamic(text)).text
    }

    fn expand(&self, text: &str, depth: usize, unresolved: &mut Vec<String>) -> String {
        REFERENCE
            .replace_all(text, |caps: &Captures<'_>| {
                let token = &caps[0];
                let Some(reference) = VariableReference::from_captures(caps) else {
                    return token.to_string();
                };
                match self.resolve(&reference) {
                    Some(value) if value.contains("{{") && depth < self.max_depth => {
                        self.expand(&value, depth + 1, unresolved)
                    }
                    Some(value) => value,
                    None => {
                        push_unique(unresolved, token);
                        token.to_string()
                    }
                }
            })
            .into_owned()
    }

    fn resolve(&self, reference: &VariableReference) -> Option<String> {
        match reference.kind {
            ReferenceKind::Dynamic => DynamicVariables::generate(&format!("${}", reference.name)),
            ReferenceKind::Scoped(scope) => self
                .scopes
                .lookup_in(scope, &reference.name)
                .map(str::to_string),
            ReferenceKind::Unscoped => self.scopes.lookup(&reference.name).map(str::to_string),
        }
    }
}

fn push_unique(list: &mut Vec<String>, token: &str) {
    if !list.iter().any(|t| t == token) {
        list.push(token.to_string());
    }
}

/// Merges `more` into `list`, keeping first-seen order.
pub fn merge_unresolved(list: &mut Vec<String>, more: impl IntoIterator<Item = String>) {
    for token in more {
        push_unique(list, &token);
    }
}

/// Expands bare `$name` references to dynamic values, leaving `{{...}}`
/// tokens and unknown names untouched.
#[must_use]
pub fn expand_legacy_dynamic(text: &str) -> String {
    LEGACY_DYNAMIC
        .replace_all(text, |caps: &Captures<'_>| {
            let whole = &caps[0];
            caps.get(1)
                .and_then(|_| DynamicVariables::generate(whole))
                .unwrap_or_else(|| whole.to_string())
        })
        .into_owned()
}

/// Request-time substitution against environment, collection and extracted scopes.
#[must_use]
pub fn substitute(
    text: &str,
    environment: &VariableMap,
    collection: &VariableMap,
    extracted: &VariableMap,
) -> Substitution {
    VariableResolver::new(VariableScopes::request(environment, collection, extracted))
        .substitute(text)
}

/// Map variant of [`substitute`].
#[must_use]
pub fn substitute_map(
    map: &VariableMap,
    environment: &VariableMap,
    collection: &VariableMap,
    extracted: &VariableMap,
) -> (VariableMap, Vec<String>) {
    VariableResolver::new(VariableScopes::request(environment, collection, extracted))
        .substitute_map(map)
}
