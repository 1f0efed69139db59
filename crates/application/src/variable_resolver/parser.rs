//! Parser for `{{reference}}` syntax
//!
//! A reference is `{{`, an optional scope tag (`env.`, `col.`, `ext.`) or a
//! `$` marking a dynamic variable, an identifier, then `}}`.

use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use vortex_domain::VariableScope;

/// Matches one reference. Group 1 is the scope tag, group 2 the `$` marker,
/// group 3 the identifier.
#[allow(clippy::expect_used)]
pub(crate) static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(?:(env|col|ext)\.|(\$))?([A-Za-z_][A-Za-z0-9_]*)\}\}")
        .expect("reference pattern is valid")
});

#[allow(clippy::expect_used)]
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

/// What a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// No tag: looked up through the priority cascade.
    Unscoped,
    /// `env.`, `col.` or `ext.`: looked up in that scope only.
    Scoped(VariableScope),
    /// `$name`: produced by the dynamic generator.
    Dynamic,
}

/// A parsed reference and where it sits in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableReference {
    /// How the reference is resolved.
    pub kind: ReferenceKind,
    /// Bare identifier, without tag or `$`.
    pub name: String,
    /// Byte range of the whole `{{...}}` token.
    pub span: Range<usize>,
}

impl VariableReference {
    pub(crate) fn from_captures(caps: &Captures<'_>) -> Option<Self> {
        let whole = caps.get(0)?;
        let name = caps.get(3)?.as_str().to_string();
        let kind = if caps.get(2).is_some() {
            ReferenceKind::Dynamic
        } else if let Some(tag) = caps.get(1) {
            ReferenceKind::Scoped(VariableScope::from_tag(tag.as_str())?)
        } else {
            ReferenceKind::Unscoped
        };
        Some(Self {
            kind,
            name,
            span: whole.range(),
        })
    }

    /// The reference as written between the braces (`env.host`, `$guid`, `id`).
    #[must_use]
    pub fn inner(&self) -> String {
        match self.kind {
            ReferenceKind::Unscoped => self.name.clone(),
            ReferenceKind::Dynamic => format!("${}", self.name),
            ReferenceKind::Scoped(scope) => {
                format!("{}.{}", scope.tag().unwrap_or_default(), self.name)
            }
        }
    }
}

/// Parses every reference in the text, left to right.
///
/// # Examples
///
/// ```
/// use vortex_application::variable_resolver::parser::{parse_references, ReferenceKind};
///
/// let refs = parse_references("{{env.host}}/{{id}}?t={{$timestamp}}");
/// assert_eq!(refs.len(), 3);
/// assert_eq!(refs[1].kind, ReferenceKind::Unscoped);
/// assert_eq!(refs[2].kind, ReferenceKind::Dynamic);
/// ```
#[must_use]
pub fn parse_references(text: &str) -> Vec<VariableReference> {
    REFERENCE
        .captures_iter(text)
        .filter_map(|caps| VariableReference::from_captures(&caps))
        .collect()
}

/// Distinct references in the text, as written between the braces.
#[must_use]
pub fn find_variables(text: &str) -> BTreeSet<String> {
    parse_references(text)
        .iter()
        .map(VariableReference::inner)
        .collect()
}

/// Checks a bare variable name against the identifier grammar.
#[must_use]
pub fn validate_name(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Wraps a name in reference braces.
#[must_use]
pub fn format_variable(name: &str) -> String {
    format!("{{{{{name}}}}}")
}

/// Strips the braces from a single `{{name}}` token.
///
/// Returns `None` unless the whole input is one brace-wrapped token.
#[must_use]
pub fn extract_variable_name(token: &str) -> Option<&str> {
    let inner = token.trim().strip_prefix("{{")?.strip_suffix("}}")?;
    let inner = inner.trim();
    if inner.is_empty() || inner.contains("{{") || inner.contains("}}") {
        return None;
    }
    Some(inner)
}

/// Returns true if the text contains at least one well-formed reference.
#[must_use]
pub fn has_variables(text: &str) -> bool {
    REFERENCE.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_unscoped() {
        let refs = parse_references("{{name}}");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "name");
        assert_eq!(refs[0].kind, ReferenceKind::Unscoped);
        assert_eq!(refs[0].span, 0..8);
    }

    #[test]
    fn test_parse_scoped() {
        let refs = parse_references("{{env.a}}{{col.b}}{{ext.c}}");
        let kinds: Vec<ReferenceKind> = refs.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ReferenceKind::Scoped(VariableScope::Environment),
                ReferenceKind::Scoped(VariableScope::Collection),
                ReferenceKind::Scoped(VariableScope::Extracted),
            ]
        );
    }

    #[test]
    fn test_parse_dynamic() {
        let refs = parse_references("id={{$guid}}");
        assert_eq!(refs[0].kind, ReferenceKind::Dynamic);
        assert_eq!(refs[0].name, "guid");
        assert_eq!(refs[0].inner(), "$guid");
    }

    #[test]
    fn test_unknown_tag_is_not_a_reference() {
        assert!(parse_references("{{foo.bar}}").is_empty());
        assert!(parse_references("{{ name }}").is_empty());
        assert!(parse_references("{{1abc}}").is_empty());
        assert!(parse_references("{name}").is_empty());
    }

    #[test]
    fn test_span_positions() {
        let input = "Hello {{env.user}}, welcome!";
        let refs = parse_references(input);
        assert_eq!(&input[refs[0].span.clone()], "{{env.user}}");
    }

    #[test]
    fn test_find_variables_dedups() {
        let found = find_variables("{{a}}/{{a}}/{{env.b}}/{{$guid}}");
        let found: Vec<&str> = found.iter().map(String::as_str).collect();
        assert_eq!(found, vec!["$guid", "a", "env.b"]);
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name"));
        assert!(validate_name("_private"));
        assert!(validate_name("myVar123"));
        assert!(!validate_name(""));
        assert!(!validate_name("123var"));
        assert!(!validate_name("var-name"));
        assert!(!validate_name("$uuid"));
    }

    #[test]
    fn test_format_and_extract() {
        assert_eq!(format_variable("host"), "{{host}}");
        assert_eq!(extract_variable_name("{{host}}"), Some("host"));
        assert_eq!(extract_variable_name(&format_variable("x")), Some("x"));
        assert_eq!(extract_variable_name("host"), None);
        assert_eq!(extract_variable_name("{{}}"), None);
    }

    #[test]
    fn test_has_variables() {
        assert!(has_variables("Hello {{name}}!"));
        assert!(!has_variables("{{incomplete"));
        assert!(!has_variables("plain"));
    }
}
