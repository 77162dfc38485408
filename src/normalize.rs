//! Translation of loosely-typed tool arguments into REST parameters.
//!
//! Tool arguments arrive as plain strings: possibly empty, possibly JSON.
//! Absent or empty optional arguments never produce a key in the outgoing
//! parameters.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::client::Params;
use crate::error::ToolError;

/// Parse an optional JSON argument. Empty or whitespace-only input is `None`.
pub fn parse_json_or_none(
    raw: Option<&str>,
    argument: &'static str,
) -> Result<Option<Value>, ToolError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => serde_json::from_str(text)
            .map(Some)
            .map_err(|e| ToolError::invalid_json(argument, e)),
        None => Ok(None),
    }
}

/// Parse an optional JSON object argument.
pub fn parse_object_or_none(
    raw: Option<&str>,
    argument: &'static str,
) -> Result<Option<Map<String, Value>>, ToolError> {
    match parse_json_or_none(raw, argument)? {
        Some(Value::Object(obj)) => Ok(Some(obj)),
        Some(other) => Err(ToolError::InvalidArgument {
            argument,
            reason: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
        None => Ok(None),
    }
}

/// Parse a required JSON object argument (e.g. the `fields` of a create call).
pub fn parse_object(raw: &str, argument: &'static str) -> Result<Map<String, Value>, ToolError> {
    if raw.trim().is_empty() {
        return Err(ToolError::InvalidArgument {
            argument,
            reason: "a JSON object is required".to_string(),
        });
    }
    Ok(parse_object_or_none(Some(raw), argument)?.unwrap_or_default())
}

/// Split a comma-separated field list into trimmed, non-empty names.
/// No deduplication.
pub fn parse_field_list(raw: Option<&str>) -> Option<Vec<String>> {
    let fields: Vec<String> = raw?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!fields.is_empty()).then_some(fields)
}

/// Normalize a multi-valued argument (e.g. calendar section IDs) to a list.
///
/// Lists pass through, numbers become a one-element list, and strings are
/// tried as JSON first, then as a comma-separated list where all-digit tokens
/// become integers.
pub fn normalize_multi_value(raw: &Value) -> Vec<Value> {
    match raw {
        Value::Array(items) => items.clone(),
        Value::Number(n) => vec![integer_or_number(n)],
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => items,
            Ok(scalar) => vec![scalar],
            Err(_) => s
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| {
                    if t.bytes().all(|b| b.is_ascii_digit()) {
                        t.parse::<i64>()
                            .map(Value::from)
                            .unwrap_or_else(|_| Value::String(t.to_string()))
                    } else {
                        Value::String(t.to_string())
                    }
                })
                .collect(),
        },
        _ => Vec::new(),
    }
}

/// Concatenate normalized values from several sources, in priority order,
/// keeping the first occurrence of each value by string equality.
pub fn merge_multi_values<I>(sources: I) -> Vec<Value>
where
    I: IntoIterator<Item = Vec<Value>>,
{
    let mut seen = HashSet::new();
    sources
        .into_iter()
        .flatten()
        .filter(|v| seen.insert(dedup_key(v)))
        .collect()
}

/// Rename legacy keys to their canonical spelling. A pair only applies when
/// the legacy key is present and the canonical key is not, so the first
/// matching alias for a canonical key wins.
pub fn merge_aliases(params: &mut Params, alias_pairs: &[(&str, &str)]) {
    for (legacy, canonical) in alias_pairs {
        if params.contains_key(*canonical) {
            continue;
        }
        if let Some(value) = params.remove(*legacy) {
            params.insert(canonical.to_string(), value);
        }
    }
}

/// Set `key` only when it is absent.
pub fn apply_default(params: &mut Params, key: &str, default: Value) {
    if !params.contains_key(key) {
        params.insert(key.to_string(), default);
    }
}

/// Best-effort integer coercion. Values that cannot be coerced come back
/// unchanged.
pub fn coerce_int(value: Value) -> Value {
    let coerced = match &value {
        Value::Number(n) if n.is_f64() => n
            .as_f64()
            .filter(|f| f.is_finite())
            .map(|f| Value::from(f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        _ => None,
    };
    coerced.unwrap_or(value)
}

/// Truncate a result list to `limit` items. Zero or negative means unbounded.
pub fn apply_limit(mut items: Vec<Value>, limit: i64) -> Vec<Value> {
    if limit > 0 {
        items.truncate(limit as usize);
    }
    items
}

/// Insert `value` under `key` only when it is present.
pub fn insert_some(params: &mut Params, key: &str, value: Option<impl Into<Value>>) {
    if let Some(value) = value {
        params.insert(key.to_string(), value.into());
    }
}

/// Treat an empty or whitespace-only optional string as absent.
pub fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.filter(|s| !s.trim().is_empty())
}

fn integer_or_number(n: &serde_json::Number) -> Value {
    if n.is_f64() {
        n.as_f64()
            .filter(|f| f.is_finite())
            .map(|f| Value::from(f.trunc() as i64))
            .unwrap_or_else(|| Value::Number(n.clone()))
    } else {
        Value::Number(n.clone())
    }
}

fn dedup_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
