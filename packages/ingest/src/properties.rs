//! Coercion of `GeoJSON` feature properties into typed values.
//!
//! Panel layers are exported by different tools, so numeric columns may
//! arrive as JSON numbers or as numeric strings and codes may arrive as
//! numbers. Values that cannot be coerced become missing rather than
//! failing the load.

use geojson::JsonObject;
use serde_json::Value;

/// Reads a property as a trimmed, non-empty string. Numbers are rendered
/// with their JSON representation.
#[must_use]
pub fn property_string(props: &JsonObject, key: &str) -> Option<String> {
    match props.get(key)? {
        Value::String(s) => Some(s.trim())
            .filter(|s| !s.is_empty())
            .map(ToString::to_string),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Reads a property as a finite number. Numeric strings are parsed;
/// anything else is missing.
#[must_use]
pub fn property_f64(props: &JsonObject, key: &str) -> Option<f64> {
    let value = match props.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}

/// Returns the names in `required` that are not keys of `props`.
#[must_use]
pub fn missing_keys(props: Option<&JsonObject>, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|key| props.is_none_or(|p| !p.contains_key(**key)))
        .map(|key| (*key).to_string())
        .collect()
}
