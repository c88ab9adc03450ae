//! # Configuration Trees
//!
//! Structural helpers over JSON key/value trees, independent of pane type.

use serde_json::{Map, Value};

/// Configuration record as stored in flows and panes
pub type Settings = Map<String, Value>;

/// Deep-merge `overrides` into `base`.
///
/// Supplied keys override; when both sides hold an object the merge recurses
/// instead of replacing the whole mapping. Arrays and scalars are replaced.
pub fn merge_deep(base: &mut Settings, overrides: &Settings) {
    for (key, value) in overrides {
        match (base.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_deep(existing, incoming);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Return a merged copy of `defaults` with `overrides` applied
pub fn merged(defaults: &Settings, overrides: &Settings) -> Settings {
    let mut result = defaults.clone();
    merge_deep(&mut result, overrides);
    result
}

/// Keep only the keys of `values` that also appear in `allowed`
pub fn intersect_keys(values: &Settings, allowed: &Settings) -> Settings {
    values
        .iter()
        .filter(|(key, _)| allowed.contains_key(key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Loose truthiness for checkbox-style settings (`true`, `1`, `"1"`, `"true"`)
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::String(s)) => !s.is_empty() && s != "0" && s != "false",
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(Value::Null) | None => false,
    }
}

/// Build a `Settings` map from a `json!` object literal
pub fn settings(value: Value) -> Settings {
    match value {
        Value::Object(map) => map,
        _ => Settings::new(),
    }
}
