//! Native halves of the sandbox globals and `require()` shims: the
//! `moment` formatter, `uuid`, and `btoa`/`atob`.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, Datelike, Timelike, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the native module helpers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModuleError {
    /// `btoa` got a character outside Latin-1.
    #[error("btoa: string contains characters outside of the Latin1 range")]
    InvalidCharacter,

    /// `atob` got something that is not base64.
    #[error("atob: the string to be decoded is not correctly encoded ({0})")]
    InvalidBase64(String),

    /// The timestamp is outside the representable range.
    #[error("Invalid date")]
    InvalidDate,
}

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Base64-encodes a Latin-1 string.
///
/// # Errors
///
/// Returns [`ModuleError::InvalidCharacter`] for code points above U+00FF.
pub fn btoa(input: &str) -> Result<String, ModuleError> {
    let bytes = input
        .chars()
        .map(|c| u8::try_from(u32::from(c)).map_err(|_| ModuleError::InvalidCharacter))
        .collect::<Result<Vec<u8>, _>>()?;
    Ok(LENIENT.encode(bytes))
}

/// Decodes base64 into a Latin-1 string. ASCII whitespace is ignored and
/// padding is optional.
///
/// # Errors
///
/// Returns [`ModuleError::InvalidBase64`] when the input does not decode.
pub fn atob(input: &str) -> Result<String, ModuleError> {
    let compact: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = LENIENT
        .decode(compact)
        .map_err(|e| ModuleError::InvalidBase64(e.to_string()))?;
    Ok(bytes.into_iter().map(char::from).collect())
}

/// A random UUID string; version 1 is time-based with a random node id,
/// anything else is version 4.
#[must_use]
pub fn uuid(version: u8) -> String {
    match version {
        1 => Uuid::now_v1(&rand::random::<[u8; 6]>()).to_string(),
        _ => Uuid::new_v4().to_string(),
    }
}

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

// Longest tokens first so `YYYY` wins over `YY`.
const TOKENS: &[&str] = &[
    "YYYY", "MMMM", "dddd", "MMM", "ddd", "SSS", "YY", "MM", "DD", "HH", "hh", "mm", "ss", "M",
    "D", "H", "h", "m", "s", "A", "a", "X", "x", "Z",
];

/// Formats a millisecond timestamp in UTC using moment.js tokens.
///
/// Supported tokens: `YYYY YY MMMM MMM MM M DD D dddd ddd HH H hh h mm m ss s
/// SSS A a X x Z`; text inside `[...]` is copied verbatim. Without a pattern
/// the ISO-8601 form `YYYY-MM-DDTHH:mm:ssZ` is used.
///
/// # Errors
///
/// Returns [`ModuleError::InvalidDate`] for timestamps chrono cannot represent.
pub fn format_moment(millis: f64, pattern: Option<&str>) -> Result<String, ModuleError> {
    if !millis.is_finite() {
        return Err(ModuleError::InvalidDate);
    }
    #[allow(clippy::cast_possible_truncation)]
    let time = DateTime::from_timestamp_millis(millis as i64).ok_or(ModuleError::InvalidDate)?;
    let pattern = pattern.unwrap_or("YYYY-MM-DDTHH:mm:ssZ");

    let mut out = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;
    while !rest.is_empty() {
        if let Some(literal) = rest.strip_prefix('[') {
            let end = literal.find(']').unwrap_or(literal.len());
            out.push_str(&literal[..end]);
            rest = literal.get(end + 1..).unwrap_or_default();
            continue;
        }
        if let Some(token) = TOKENS.iter().find(|t| rest.starts_with(**t)) {
            out.push_str(&render(&time, token));
            rest = &rest[token.len()..];
            continue;
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    Ok(out)
}

fn render(time: &DateTime<Utc>, token: &str) -> String {
    let hour12 = match time.hour() % 12 {
        0 => 12,
        h => h,
    };
    match token {
        "YYYY" => format!("{:04}", time.year()),
        "YY" => format!("{:02}", time.year().rem_euclid(100)),
        "MMMM" => MONTHS[time.month0() as usize].to_string(),
        "MMM" => MONTHS[time.month0() as usize][..3].to_string(),
        "MM" => format!("{:02}", time.month()),
        "M" => time.month().to_string(),
        "DD" => format!("{:02}", time.day()),
        "D" => time.day().to_string(),
        "dddd" => WEEKDAYS[time.weekday().num_days_from_sunday() as usize].to_string(),
        "ddd" => WEEKDAYS[time.weekday().num_days_from_sunday() as usize][..3].to_string(),
        "HH" => format!("{:02}", time.hour()),
        "H" => time.hour().to_string(),
        "hh" => format!("{hour12:02}"),
        "h" => hour12.to_string(),
        "mm" => format!("{:02}", time.minute()),
        "m" => time.minute().to_string(),
        "ss" => format!("{:02}", time.second()),
        "s" => time.second().to_string(),
        "SSS" => format!("{:03}", time.timestamp_subsec_millis()),
        "A" => if time.hour() < 12 { "AM" } else { "PM" }.to_string(),
        "a" => if time.hour() < 12 { "am" } else { "pm" }.to_string(),
        "X" => time.timestamp().to_string(),
        "x" => time.timestamp_millis().to_string(),
        "Z" => "+00:00".to_string(),
        other => other.to_string(),
    }
}
