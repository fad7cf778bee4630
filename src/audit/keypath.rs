//! Dot-notation key paths.
//!
//! [`reconstruct`] expands `{"a.b.c": 1}` into `{"a": {"b": {"c": 1}}}`;
//! [`flatten`] is its inverse and is only applied at export time.
//!
//! Collisions resolve as last-key-wins: when a key needs to descend through a
//! segment that currently holds a scalar, the scalar is replaced by a new
//! mapping, and a key that lands directly on an existing segment replaces
//! whatever was there. Either way the segment keeps the position of its first
//! occurrence.

use serde_json::{Map, Value};

pub const SEPARATOR: char = '.';

/// Expand every dotted key of `flat` into nested mappings.
///
/// Mapping values are expanded recursively, so no key at any depth of the
/// result contains [`SEPARATOR`].
pub fn reconstruct(flat: Map<String, Value>) -> Map<String, Value> {
    let mut nested = Map::new();
    for (key, value) in flat {
        insert_path(&mut nested, &key, value);
    }
    nested
}

/// Assign `value` at the dotted `path` inside `target`, creating intermediate
/// mappings as needed.
pub fn insert_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    let value = match value {
        Value::Object(inner) => Value::Object(reconstruct(inner)),
        other => other,
    };

    let mut current = target;
    let mut segments = path.split(SEPARATOR).peekable();

    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }

        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = match slot {
            Value::Object(map) => map,
            _ => unreachable!("slot was just made an object"),
        };
    }
}

/// Collapse nested mappings back into dotted keys.
///
/// Scalars, sequences and empty mappings are leaves. Key order follows a
/// depth-first walk of the input.
pub fn flatten(nested: &Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    flatten_into(&mut flat, None, nested);
    flat
}

/// Dotted paths of every leaf in `nested`, in the same order as [`flatten`].
pub fn leaf_paths(nested: &Map<String, Value>) -> Vec<String> {
    flatten(nested).into_iter().map(|(k, _)| k).collect()
}

fn flatten_into(
    flat: &mut Map<String, Value>,
    prefix: Option<&str>,
    nested: &Map<String, Value>,
) {
    for (key, value) in nested {
        let path = match prefix {
            Some(prefix) => format!("{prefix}{SEPARATOR}{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(flat, Some(&path), inner),
            leaf => {
                flat.insert(path, leaf.clone());
            }
        }
    }
}
