//! String-preserving conversion of Splunk's job documents.
//!
//! Responsibilities:
//! - Turn the JSON values of a job's `content` object into the service's
//!   string wire form, so snapshots compare against `"1"`, `"1000"`, etc.
//! - Parse the handful of boolean/number encodings used in those strings.
//!
//! Explicitly does NOT handle:
//! - Deciding which properties exist or what they mean (see `models::jobs`).
//!
//! Invariants / assumptions:
//! - Splunk reports the same property as `true`, `1`, or `"1"` depending on
//!   endpoint and version. All of them map to the same wire string.
//! - Conversion never fails; unusual shapes fall back to compact JSON text.

use serde_json::Value;

/// Encode one JSON value in the service's string wire form.
///
/// - strings are kept verbatim
/// - booleans become `"1"` / `"0"`
/// - numbers keep their JSON text (`5`, `0.42`)
/// - `null` becomes the empty string
/// - arrays and objects become compact JSON text
pub fn to_wire_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Interpret a wire string as a boolean flag.
///
/// Accepts the forms Splunk uses for flags; anything else is `None`.
pub fn parse_wire_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" | "True" | "TRUE" => Some(true),
        "0" | "false" | "False" | "FALSE" | "" => Some(false),
        _ => None,
    }
}

/// Interpret a wire string as an unsigned integer.
///
/// Float encodings with no fractional part (`"3.0"`) are accepted because some
/// Splunk versions report counts that way.
pub fn parse_wire_u64(value: &str) -> Option<u64> {
    let trimmed = value.trim();
    if let Ok(v) = trimmed.parse::<u64>() {
        return Some(v);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Some(f as u64),
        _ => None,
    }
}

/// Interpret a wire string as a float.
pub fn parse_wire_f64(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}
