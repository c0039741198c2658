//! Dotted-path access into JSON trees.
//!
//! Paths are dot-delimited property names (`data.values.title`). A segment that
//! parses as an integer indexes into an array. Reads never fail: a path that does not
//! resolve yields `None`. Writes create intermediate objects as needed and mutate the
//! value they are given; clone first when the original must be preserved.
//!
//! # Examples
//!
//! ```rust
//! use serde_json::json;
//! use sitedoc::utils::path;
//!
//! let mut doc = json!({ "values": { "groups": ["a", "b"] } });
//! assert_eq!(path::get(&doc, "values.groups.1"), Some(&json!("b")));
//! assert_eq!(path::get(&doc, "values.missing.deeper"), None);
//!
//! path::set(&mut doc, "catalog.groups", json!([]));
//! assert!(path::has(&doc, "catalog.groups"));
//!
//! path::delete(&mut doc, "values.groups");
//! assert_eq!(doc, json!({ "values": {}, "catalog": { "groups": [] } }));
//! ```

use serde_json::{Map, Value};

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|segment| !segment.is_empty())
}

fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn child_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        _ => None,
    }
}

/// Read the value at `path`, or `None` if any segment is missing.
#[must_use]
pub fn get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).try_fold(value, child)
}

/// Mutable variant of [`get`].
pub fn get_mut<'a>(value: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    segments(path).try_fold(value, child_mut)
}

/// Whether `path` resolves to a value (including `null`).
#[must_use]
pub fn has(value: &Value, path: &str) -> bool {
    get(value, path).is_some()
}

/// Write `new_value` at `path`, creating intermediate objects.
///
/// Intermediate values that are neither objects nor addressable array slots are
/// replaced by empty objects. An empty path replaces the root.
pub fn set(value: &mut Value, path: &str, new_value: Value) {
    let parts: Vec<&str> = segments(path).collect();
    let Some((leaf, parents)) = parts.split_last() else {
        *value = new_value;
        return;
    };

    let mut cursor = value;
    for segment in parents {
        let index = match &*cursor {
            Value::Array(items) => segment.parse::<usize>().ok().filter(|i| *i < items.len()),
            _ => None,
        };
        if index.is_none() && !cursor.is_object() {
            *cursor = Value::Object(Map::new());
        }
        cursor = match (cursor, index) {
            (Value::Array(items), Some(i)) => &mut items[i],
            (Value::Object(map), _) => {
                let entry = map.entry((*segment).to_string()).or_insert(Value::Null);
                if !entry.is_object() && !entry.is_array() {
                    *entry = Value::Object(Map::new());
                }
                entry
            }
            (other, _) => other,
        };
    }

    if let Value::Array(items) = cursor {
        if let Ok(i) = leaf.parse::<usize>() {
            if i < items.len() {
                items[i] = new_value;
                return;
            }
            if i == items.len() {
                items.push(new_value);
                return;
            }
        }
    }
    if !cursor.is_object() {
        *cursor = Value::Object(Map::new());
    }
    if let Value::Object(map) = cursor {
        map.insert((*leaf).to_string(), new_value);
    }
}

/// Remove the value at `path`, returning it if the path resolved.
pub fn delete(value: &mut Value, path: &str) -> Option<Value> {
    let parts: Vec<&str> = segments(path).collect();
    let (leaf, parents) = parts.split_last()?;

    let parent = parents.iter().try_fold(value, |v, segment| child_mut(v, segment))?;
    match parent {
        Value::Object(map) => map.remove(*leaf),
        Value::Array(items) => match leaf.parse::<usize>() {
            Ok(i) if i < items.len() => Some(items.remove(i)),
            _ => None,
        },
        _ => None,
    }
}
