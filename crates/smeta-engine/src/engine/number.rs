//! Lenient parsing of raw cell inputs.
//!
//! Estimate rows are typed by hand and imported from older documents, so a
//! quantity may arrive as `10`, `"10"`, `"1 200,50"` or `"abc"`. Anything that
//! is not a finite number parses to `None` and the caller picks the default.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn numeric_re() -> &'static Regex {
    static NUMERIC_RE: OnceLock<Regex> = OnceLock::new();
    NUMERIC_RE.get_or_init(|| {
        Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?$")
            .expect("numeric input regex must compile")
    })
}

/// Parse a raw JSON value as a finite number.
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|n| n.is_finite()),
        Value::String(s) => parse_number_str(s),
        _ => None,
    }
}

/// Parse user text as a finite number.
///
/// Accepts space, NBSP and thin-space thousands separators, a decimal comma
/// and a trailing `%`.
pub fn parse_number_str(input: &str) -> Option<f64> {
    let compact: String = input
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{2009}' | '\u{202f}'))
        .collect();
    let compact = compact.strip_suffix('%').unwrap_or(&compact);
    let normalized = compact.replace(',', ".");
    if !numeric_re().is_match(&normalized) {
        return None;
    }
    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse a raw JSON value as a boolean flag.
///
/// Legacy documents store flags as `true`, `1`, `"1"` or `"true"`.
pub fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" | "да" => Some(true),
            "false" | "0" | "no" | "off" | "нет" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Replace NaN and infinities with zero.
pub fn finite_or_zero(n: f64) -> f64 {
    if n.is_finite() { n } else { 0.0 }
}
