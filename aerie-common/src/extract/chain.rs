//! Ordered fallback chains over dotted JSON paths
//!
//! A chain is a list of paths tried in order; the first one that is present and
//! not `null` wins. A winner of the wrong type is a [`MalformedRecord`], not a
//! silent fall-through, so drifted payloads surface in the logs.

use serde_json::Value;

use super::MalformedRecord;

/// Resolve a dotted path (`"legacy.full_text"`) against a node
///
/// Missing segments, `null` values and non-object intermediates all yield `None`.
pub fn lookup<'a>(node: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = node;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// First defined, non-null value along the chain, with the path that produced it
pub fn first_defined<'a>(node: &'a Value, paths: &[&'static str]) -> Option<(&'static str, &'a Value)> {
    paths
        .iter()
        .find_map(|path| lookup(node, path).map(|value| (*path, value)))
}

fn wrong_type(path: &str, expected: &'static str) -> MalformedRecord {
    MalformedRecord::WrongType {
        path: path.to_string(),
        expected,
    }
}

/// String chain
pub fn string(node: &Value, paths: &[&'static str]) -> Result<Option<String>, MalformedRecord> {
    match first_defined(node, paths) {
        None => Ok(None),
        Some((_, Value::String(s))) => Ok(Some(s.clone())),
        Some((path, _)) => Err(wrong_type(path, "string")),
    }
}

/// Identifier chain: non-empty strings, or integers rendered in decimal
///
/// Empty strings count as undefined so the next link is tried.
pub fn identifier(node: &Value, paths: &[&'static str]) -> Result<Option<String>, MalformedRecord> {
    for path in paths {
        match lookup(node, path) {
            None => continue,
            Some(Value::String(s)) if s.is_empty() => continue,
            Some(Value::String(s)) => return Ok(Some(s.clone())),
            Some(Value::Number(n)) => {
                if let Some(v) = n.as_u64() {
                    return Ok(Some(v.to_string()));
                }
                if let Some(v) = n.as_i64() {
                    return Ok(Some(v.to_string()));
                }
                return Err(wrong_type(path, "integer id"));
            }
            Some(_) => return Err(wrong_type(path, "string or integer id")),
        }
    }
    Ok(None)
}

/// Counter chain; integers or numeric strings, 0 when undefined
pub fn count(node: &Value, paths: &[&'static str]) -> Result<i64, MalformedRecord> {
    match first_defined(node, paths) {
        None => Ok(0),
        Some((path, Value::Number(n))) => n.as_i64().ok_or_else(|| wrong_type(path, "integer")),
        Some((path, Value::String(s))) => {
            s.trim().parse::<i64>().map_err(|_| wrong_type(path, "integer"))
        }
        Some((path, _)) => Err(wrong_type(path, "integer")),
    }
}

/// Boolean chain
pub fn boolean(node: &Value, paths: &[&'static str]) -> Result<Option<bool>, MalformedRecord> {
    match first_defined(node, paths) {
        None => Ok(None),
        Some((_, Value::Bool(b))) => Ok(Some(*b)),
        Some((path, _)) => Err(wrong_type(path, "boolean")),
    }
}

/// Array chain; empty slice when undefined
pub fn array<'a>(node: &'a Value, paths: &[&'static str]) -> Result<&'a [Value], MalformedRecord> {
    match first_defined(node, paths) {
        None => Ok(&[]),
        Some((_, Value::Array(items))) => Ok(items.as_slice()),
        Some((path, _)) => Err(wrong_type(path, "array")),
    }
}

/// Optional object at a single path
pub fn object<'a>(node: &'a Value, path: &'static str) -> Result<Option<&'a Value>, MalformedRecord> {
    match lookup(node, path) {
        None => Ok(None),
        Some(value) if value.is_object() => Ok(Some(value)),
        Some(_) => Err(wrong_type(path, "object")),
    }
}
