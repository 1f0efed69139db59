//! BDD assertion evaluation behind `pm.expect`.
//!
//! The sandbox encodes each operand as a [`Subject`] and the chain word as an
//! operation name; evaluation happens here and yields either a pass or the
//! failure message the script sees on the thrown `AssertionError`.

use regex::RegexBuilder;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// JavaScript type of an encoded operand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// `undefined`.
    #[default]
    Undefined,
    /// `null`.
    Null,
    /// Boolean.
    Boolean,
    /// Number, including `NaN` (encoded with a null value).
    Number,
    /// String.
    String,
    /// Array.
    Array,
    /// Plain object.
    Object,
    /// Function.
    Function,
    /// Regular expression.
    Regexp,
    /// Anything else (symbols, bigints, ...).
    Other,
}

impl Kind {
    const fn is_primitive(self) -> bool {
        matches!(
            self,
            Self::Undefined | Self::Null | Self::Boolean | Self::Number | Self::String
        )
    }

    const fn type_name(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
            Self::Function => "function",
            Self::Regexp => "regexp",
            Self::Other => "other",
        }
    }
}

/// One operand as encoded by the sandbox.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Subject {
    /// JavaScript type.
    pub kind: Kind,
    /// JSON projection of the value.
    pub value: Value,
    /// Text used in failure messages.
    pub display: String,
    /// JavaScript truthiness.
    pub truthy: bool,
    /// Pattern source, for regular expressions.
    pub source: Option<String>,
    /// Pattern flags, for regular expressions.
    pub flags: Option<String>,
    /// Whether the operand is `===` the first argument.
    pub same: bool,
}

impl Subject {
    /// Subject for a JSON value, as the sandbox would encode it.
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        let (kind, truthy) = match &value {
            Value::Null => (Kind::Null, false),
            Value::Bool(b) => (Kind::Boolean, *b),
            Value::Number(n) => (Kind::Number, n.as_f64().is_some_and(|f| f != 0.0)),
            Value::String(s) => (Kind::String, !s.is_empty()),
            Value::Array(_) => (Kind::Array, true),
            Value::Object(_) => (Kind::Object, true),
        };
        let display = match &value {
            Value::String(s) => format!("'{s}'"),
            other => other.to_string(),
        };
        Self {
            kind,
            value,
            display,
            truthy,
            ..Self::default()
        }
    }

    /// The `undefined` subject.
    #[must_use]
    pub fn undefined() -> Self {
        Self {
            display: "undefined".to_string(),
            ..Self::default()
        }
    }
}

/// Reasons an assertion cannot be evaluated at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssertionError {
    /// The chain used an operation this engine does not know.
    #[error("unsupported assertion: {0}")]
    Unsupported(String),

    /// The operation needs an argument that was not given.
    #[error("{0} requires an argument")]
    MissingArgument(String),

    /// A `match` pattern failed to compile.
    #[error("invalid pattern /{pattern}/: {reason}")]
    InvalidPattern {
        /// Pattern source.
        pattern: String,
        /// Compiler message.
        reason: String,
    },
}

/// Evaluates one assertion.
///
/// Returns `Ok(None)` on pass and `Ok(Some(message))` on failure.
///
/// # Errors
///
/// Returns [`AssertionError`] when the assertion itself is malformed.
pub fn evaluate(
    op: &str,
    actual: &Subject,
    args: &[Subject],
    negate: bool,
) -> Result<Option<String>, AssertionError> {
    let arg = |i: usize| {
        args.get(i)
            .ok_or_else(|| AssertionError::MissingArgument(op.to_string()))
    };

    let (passed, phrase) = match op {
        "equal" | "equals" | "eq" => {
            let expected = arg(0)?;
            (strict_equal(actual, expected), format!("equal {}", expected.display))
        }
        "eql" | "eqls" | "deepEqual" => {
            let expected = arg(0)?;
            (
                actual.kind == expected.kind && json_eq(&actual.value, &expected.value),
                format!("deeply equal {}", expected.display),
            )
        }
        "match" | "matches" => {
            let pattern = arg(0)?;
            check_match(actual, pattern)?
        }
        "include" | "includes" | "contain" | "contains" => {
            let needle = arg(0)?;
            (includes(actual, needle), format!("include {}", needle.display))
        }
        "a" | "an" => {
            let expected = arg(0)?;
            let name = expected.value.as_str().unwrap_or_default().to_ascii_lowercase();
            let article = if name.starts_with(['a', 'e', 'i', 'o', 'u']) { "an" } else { "a" };
            (
                actual.kind.type_name() == name,
                format!("be {article} {name}"),
            )
        }
        "above" | "gt" | "greaterThan" => compare(actual, arg(0)?, "be above", |a, b| a > b),
        "below" | "lt" | "lessThan" => compare(actual, arg(0)?, "be below", |a, b| a < b),
        "least" | "gte" => compare(actual, arg(0)?, "be at least", |a, b| a >= b),
        "most" | "lte" => compare(actual, arg(0)?, "be at most", |a, b| a <= b),
        "within" => {
            let (low, high) = (arg(0)?, arg(1)?);
            let value = actual.value.as_f64();
            let bounds = low.value.as_f64().zip(high.value.as_f64());
            (
                matches!((value, bounds), (Some(v), Some((l, h))) if v >= l && v <= h),
                format!("be within {}..{}", low.display, high.display),
            )
        }
        "ok" => (actual.truthy, "be truthy".to_string()),
        "true" => (actual.value == Value::Bool(true), "be true".to_string()),
        "false" => (actual.value == Value::Bool(false), "be false".to_string()),
        "null" => (actual.kind == Kind::Null, "be null".to_string()),
        "undefined" => (actual.kind == Kind::Undefined, "be undefined".to_string()),
        "exist" | "exists" => (
            !matches!(actual.kind, Kind::Null | Kind::Undefined),
            "exist".to_string(),
        ),
        "NaN" => (
            actual.kind == Kind::Number && actual.value.is_null(),
            "be NaN".to_string(),
        ),
        "empty" => (is_empty(actual), "be empty".to_string()),
        "oneOf" => {
            let list = arg(0)?;
            let found = list
                .value
                .as_array()
                .is_some_and(|items| items.iter().any(|item| json_eq(item, &actual.value)));
            (found, format!("be one of {}", list.display))
        }
        "property" | "haveOwnProperty" | "ownProperty" => {
            let name = arg(0)?;
            check_property(actual, name, args.get(1))
        }
        "length" | "lengthOf" | "lengthof" => {
            let expected = arg(0)?;
            let actual_len = length_of(actual);
            let wanted = expected.value.as_f64();
            (
                actual_len.zip(wanted).is_some_and(|(a, w)| a as f64 == w),
                format!(
                    "have a length of {} but got {}",
                    expected.display,
                    actual_len.map_or_else(|| "none".to_string(), |l| l.to_string())
                ),
            )
        }
        "keys" | "key" => {
            let expected = key_list(args);
            let actual_keys: Vec<&str> = actual
                .value
                .as_object()
                .map(|o| o.keys().map(String::as_str).collect())
                .unwrap_or_default();
            (
                actual.kind == Kind::Object
                    && actual_keys.len() == expected.len()
                    && expected.iter().all(|k| actual_keys.contains(&k.as_str())),
                format!("have keys {}", expected.join(", ")),
            )
        }
        "members" => {
            let expected = arg(0)?;
            (
                same_members(&actual.value, &expected.value),
                format!("have the same members as {}", expected.display),
            )
        }
        "string" | "startsWith" | "endsWith" => {
            let needle = arg(0)?;
            let hay = actual.value.as_str();
            let want = needle.value.as_str().unwrap_or_default();
            let passed = hay.is_some_and(|h| match op {
                "startsWith" => h.starts_with(want),
                "endsWith" => h.ends_with(want),
                _ => h.contains(want),
            });
            let verb = match op {
                "startsWith" => "start with",
                "endsWith" => "end with",
                _ => "contain",
            };
            (passed, format!("{verb} {}", needle.display))
        }
        other => return Err(AssertionError::Unsupported(other.to_string())),
    };

    Ok(verdict(passed, negate, &actual.display, &phrase))
}

fn verdict(passed: bool, negate: bool, display: &str, phrase: &str) -> Option<String> {
    if passed == negate {
        let not = if negate { "not " } else { "" };
        Some(format!("expected {display} to {not}{phrase}"))
    } else {
        None
    }
}

fn strict_equal(actual: &Subject, expected: &Subject) -> bool {
    if actual.kind.is_primitive() && expected.kind.is_primitive() {
        actual.kind == expected.kind
            && match actual.kind {
                // NaN is encoded as null and never equals itself
                Kind::Number => actual
                    .value
                    .as_f64()
                    .zip(expected.value.as_f64())
                    .is_some_and(|(a, b)| a == b),
                _ => actual.value == expected.value,
            }
    } else {
        actual.same
    }
}

/// Structural equality with numbers compared as floats.
#[must_use]
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| json_eq(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| json_eq(v, other)))
        }
        _ => a == b,
    }
}

fn check_match(actual: &Subject, pattern: &Subject) -> Result<(bool, String), AssertionError> {
    let source = pattern
        .source
        .clone()
        .or_else(|| pattern.value.as_str().map(str::to_string))
        .unwrap_or_default();
    let flags = pattern.flags.as_deref().unwrap_or_default();
    let regex = RegexBuilder::new(&source)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .build()
        .map_err(|e| AssertionError::InvalidPattern {
            pattern: source.clone(),
            reason: e.to_string(),
        })?;
    let passed = actual.value.as_str().is_some_and(|s| regex.is_match(s));
    Ok((passed, format!("match /{source}/{flags}")))
}

fn includes(actual: &Subject, needle: &Subject) -> bool {
    match (&actual.value, &needle.value) {
        (Value::String(hay), Value::String(n)) => hay.contains(n.as_str()),
        (Value::Array(items), wanted) => items.iter().any(|item| json_eq(item, wanted)),
        (Value::Object(map), Value::Object(subset)) => subset
            .iter()
            .all(|(k, v)| map.get(k).is_some_and(|have| json_eq(have, v))),
        _ => false,
    }
}

fn compare(
    actual: &Subject,
    bound: &Subject,
    phrase: &str,
    cmp: fn(f64, f64) -> bool,
) -> (bool, String) {
    let passed = actual
        .value
        .as_f64()
        .zip(bound.value.as_f64())
        .is_some_and(|(a, b)| actual.kind == Kind::Number && cmp(a, b));
    (passed, format!("{phrase} {}", bound.display))
}

fn is_empty(actual: &Subject) -> bool {
    match &actual.value {
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => actual.kind == Kind::Object && o.is_empty(),
        _ => false,
    }
}

fn check_property(actual: &Subject, name: &Subject, value: Option<&Subject>) -> (bool, String) {
    let key = name
        .value
        .as_str()
        .map_or_else(|| name.value.to_string(), str::to_string);
    let found = match &actual.value {
        Value::Object(map) => map.get(&key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    };
    match value {
        None => (found.is_some(), format!("have property '{key}'")),
        Some(expected) => (
            found.is_some_and(|v| json_eq(v, &expected.value)),
            format!("have property '{key}' of {}", expected.display),
        ),
    }
}

fn length_of(actual: &Subject) -> Option<usize> {
    match &actual.value {
        Value::String(s) => Some(s.encode_utf16().count()),
        Value::Array(a) => Some(a.len()),
        _ => None,
    }
}

fn key_list(args: &[Subject]) -> Vec<String> {
    let as_key = |v: &Value| v.as_str().map_or_else(|| v.to_string(), str::to_string);
    match args {
        [single] => match &single.value {
            Value::Array(items) => items.iter().map(as_key).collect(),
            Value::Object(map) => map.keys().cloned().collect(),
            other => vec![as_key(other)],
        },
        many => many.iter().map(|s| as_key(&s.value)).collect(),
    }
}

fn same_members(actual: &Value, expected: &Value) -> bool {
    let (Some(actual), Some(expected)) = (actual.as_array(), expected.as_array()) else {
        return false;
    };
    if actual.len() != expected.len() {
        return false;
    }
    let mut remaining: Vec<&Value> = expected.iter().collect();
    actual.iter().all(|item| {
        remaining
            .iter()
            .position(|candidate| json_eq(candidate, item))
            .map(|i| remaining.swap_remove(i))
            .is_some()
    })
}
