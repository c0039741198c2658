//! The standard schema migrations.
//!
//! Each function brings a document from the previous schema version to its step's
//! target. They are only invoked by the chain, which clones the document first and
//! bumps `schemaVersion` afterwards; none of them touches the version itself.
//! Steps add or normalize. Legacy fields are removed only after their content has
//! been carried to the new location.

use serde_json::{Map, Value, json};

use crate::core::Document;
use crate::utils::is_guid;

/// v1: ensure `data.values` exists and normalize `data.values.groups` to an array
/// of group ids.
///
/// Legacy payloads stored groups as objects (`{ "id": ... }`) or as a comma separated
/// string; both become plain ids.
pub fn apply_site_schema(document: &mut Document) {
    let values = ensure_object(&mut document.data, "values");
    let Some(groups) = values.get_mut("groups") else {
        return;
    };

    let normalized: Vec<Value> = match groups {
        Value::Array(entries) => entries.iter().filter_map(group_id).map(Value::from).collect(),
        Value::String(list) => list
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(Value::from)
            .collect(),
        _ => Vec::new(),
    };
    *groups = Value::Array(normalized);
}

fn group_id(entry: &Value) -> Option<String> {
    match entry {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Object(group) => group.get("id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// v1.1: lower-case registered hostnames so they compare case-insensitively.
pub fn lowercase_domains(document: &mut Document) {
    let values = ensure_object(&mut document.data, "values");
    for key in ["subdomain", "defaultHostname", "customHostname"] {
        if let Some(Value::String(host)) = values.get_mut(key) {
            *host = host.to_lowercase();
        }
    }
}

/// v1.2: hoist `data.values.groups` into a `data.catalog` object.
///
/// An existing catalog wins; the legacy list is then left where it is.
pub fn ensure_catalog(document: &mut Document) {
    let has_catalog = document.data.get("catalog").is_some_and(Value::is_object);
    if has_catalog {
        return;
    }

    let groups = ensure_object(&mut document.data, "values")
        .remove("groups")
        .filter(Value::is_array)
        .unwrap_or_else(|| json!([]));
    ensure_object(&mut document.data, "catalog").insert("groups".to_string(), groups);
}

/// v1.3: drop catalog group entries that are not group identifiers.
pub fn purge_non_guids(document: &mut Document) {
    let catalog = ensure_object(&mut document.data, "catalog");
    if let Some(Value::Array(groups)) = catalog.get_mut("groups") {
        groups.retain(|group| group.as_str().is_some_and(is_guid));
    }
}

/// v1.4: build `data.values.telemetry` from the legacy `gacode` analytics field.
///
/// The consent notice starts disabled; the customer tracker is enabled exactly when a
/// code was configured. `gacode` is removed once carried over.
pub fn ensure_telemetry(document: &mut Document) {
    let values = ensure_object(&mut document.data, "values");
    if values.contains_key("telemetry") {
        return;
    }

    let code = values
        .get("gacode")
        .and_then(Value::as_str)
        .filter(|code| !code.is_empty())
        .map(str::to_string);

    let telemetry = json!({
        "consentNotice": {
            "isEnabled": false,
            "allowList": [],
            "policyURL": ""
        },
        "customAnalytics": {
            "ga": {
                "customerTracker": {
                    "enabled": code.is_some(),
                    "id": code.unwrap_or_default()
                }
            }
        }
    });
    values.insert("telemetry".to_string(), telemetry);
    values.remove("gacode");
}

/// v1.5: move `data.values.dcatConfig` to `data.feeds.dcatUS11`.
pub fn migrate_feed_config(document: &mut Document) {
    let values = ensure_object(&mut document.data, "values");
    let Some(config) = values.get("dcatConfig").cloned() else {
        return;
    };

    let feeds = ensure_object(&mut document.data, "feeds");
    if feeds.contains_key("dcatUS11") {
        return;
    }
    feeds.insert("dcatUS11".to_string(), config);
    ensure_object(&mut document.data, "values").remove("dcatConfig");
}

/// The object at `parent[key]`, replacing a missing or non-object value with `{}`.
///
/// `parent` itself is turned into an object if it is not one.
fn ensure_object<'a>(parent: &'a mut Value, key: &str) -> &'a mut Map<String, Value> {
    if !parent.is_object() {
        *parent = Value::Object(Map::new());
    }
    let Value::Object(map) = parent else {
        unreachable!("parent was just made an object");
    };
    let slot = map.entry(key).or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(inner) => inner,
        _ => unreachable!("slot was just made an object"),
    }
}
