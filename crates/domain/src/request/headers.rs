//! Case-insensitive header map

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// HTTP headers keyed by name.
///
/// Lookups ignore ASCII case. Overwriting an existing header keeps the casing
/// it was first stored with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderMap {
    items: BTreeMap<String, String>,
}

impl HeaderMap {
    /// Creates an empty header map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }

    fn key_of(&self, name: &str) -> Option<&String> {
        self.items.keys().find(|k| k.eq_ignore_ascii_case(name))
    }

    /// Returns the value of a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.key_of(name)
            .and_then(|k| self.items.get(k))
            .map(String::as_str)
    }

    /// Returns true if the header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.key_of(name).is_some()
    }

    /// Inserts a header or overwrites the existing value.
    pub fn upsert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let key = self.key_of(&name).cloned().unwrap_or(name);
        self.items.insert(key, value.into());
    }

    /// Removes a header, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let key = self.key_of(name).cloned()?;
        self.items.remove(&key)
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the headers as a plain map.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.items.clone()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.upsert(name, value);
        }
        map
    }
}
