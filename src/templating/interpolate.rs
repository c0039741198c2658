//! Placeholder interpolation over JSON trees.
//!
//! Templates carry placeholder tokens inside string values:
//!
//! | Token                   | Meaning                                              |
//! |-------------------------|------------------------------------------------------|
//! | `{{path}}`              | value at `path` in the settings                      |
//! | `{{path:optional}}`     | same, but the field is removed when `path` is absent |
//! | `{{path:<transform>}}`  | value passed through a registered transform          |
//!
//! A string that consists of exactly one token is replaced by the resolved value
//! itself, so `"{{teams.ids}}"` can become an array. Tokens embedded in longer
//! strings are stringified in place.
//!
//! A required token whose path is absent is left verbatim. This is how `{{appid}}`
//! survives materialization until the new record's identifier is known.

use anyhow::Result;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};
use strsim::levenshtein;

use crate::core::SiteError;
use crate::utils::{path, slugify};

/// Modifier marking a token as optional.
const OPTIONAL_MODIFIER: &str = "optional";

/// Maximum edit distance, as a percentage of the name length, for transform suggestions.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)(?::([A-Za-z0-9_\-]+))?\s*\}\}")
        .expect("token pattern is a valid regex")
});

static WHOLE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{\{\s*([A-Za-z0-9_.\-]+)(?::([A-Za-z0-9_\-]+))?\s*\}\}$")
        .expect("whole token pattern is a valid regex")
});

/// A named value transform: `(key, value, settings) -> value`.
pub type TransformFn = Arc<dyn Fn(&str, &Value, &Value) -> Value + Send + Sync>;

/// Registry of transforms available to `{{path:<transform>}}` tokens.
#[derive(Clone)]
pub struct TransformRegistry {
    transforms: BTreeMap<String, TransformFn>,
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRegistry").field("names", &self.names().collect::<Vec<_>>()).finish()
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl TransformRegistry {
    /// A registry with no transforms.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            transforms: BTreeMap::new(),
        }
    }

    /// A registry with `lowercase`, `uppercase` and `slugify`.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("lowercase", |_, value, _| map_str(value, str::to_lowercase));
        registry.register("uppercase", |_, value, _| map_str(value, str::to_uppercase));
        registry.register("slugify", |_, value, _| map_str(value, slugify));
        registry
    }

    /// Register (or replace) a transform.
    pub fn register<F>(&mut self, name: impl Into<String>, transform: F)
    where
        F: Fn(&str, &Value, &Value) -> Value + Send + Sync + 'static,
    {
        self.transforms.insert(name.into(), Arc::new(transform));
    }

    /// Look up a transform by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TransformFn> {
        self.transforms.get(name)
    }

    /// Registered transform names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.transforms.keys().map(String::as_str)
    }

    /// Closest registered name to `name`, if any is close enough.
    #[must_use]
    pub fn suggest(&self, name: &str) -> Option<String> {
        self.names()
            .map(|candidate| (candidate, levenshtein(name, candidate)))
            .filter(|(_, distance)| *distance <= name.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
            .min_by_key(|(_, distance)| *distance)
            .map(|(candidate, _)| candidate.to_string())
    }
}

fn map_str(value: &Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(s)),
        other => other.clone(),
    }
}

/// Expands placeholder tokens in a JSON tree.
pub trait Interpolator {
    /// Return a copy of `template` with tokens resolved against `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::UnknownTransform`] when a token names an unregistered
    /// transform.
    fn interpolate(
        &self,
        template: &Value,
        settings: &Value,
        transforms: &TransformRegistry,
    ) -> Result<Value>;
}

/// The `{{path}}` / `{{path:modifier}}` interpolator.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenInterpolator;

/// Outcome of expanding one value.
enum Expanded {
    Keep(Value),
    Remove,
}

/// Outcome of resolving one token.
enum Resolution {
    Found(Value),
    MissingOptional,
    MissingRequired,
}

struct Pass<'a> {
    settings: &'a Value,
    transforms: &'a TransformRegistry,
}

impl Interpolator for TokenInterpolator {
    fn interpolate(
        &self,
        template: &Value,
        settings: &Value,
        transforms: &TransformRegistry,
    ) -> Result<Value> {
        let pass = Pass {
            settings,
            transforms,
        };
        match pass.expand(template)? {
            Expanded::Keep(value) => Ok(value),
            Expanded::Remove => Ok(Value::Null),
        }
    }
}

impl Pass<'_> {
    fn expand(&self, value: &Value) -> Result<Expanded> {
        match value {
            Value::String(text) => self.expand_string(text),
            Value::Array(items) => {
                let mut expanded = Vec::with_capacity(items.len());
                for item in items {
                    if let Expanded::Keep(value) = self.expand(item)? {
                        expanded.push(value);
                    }
                }
                Ok(Expanded::Keep(Value::Array(expanded)))
            }
            Value::Object(fields) => {
                let mut expanded = Map::new();
                for (key, field) in fields {
                    if let Expanded::Keep(value) = self.expand(field)? {
                        expanded.insert(key.clone(), value);
                    }
                }
                Ok(Expanded::Keep(Value::Object(expanded)))
            }
            other => Ok(Expanded::Keep(other.clone())),
        }
    }

    fn expand_string(&self, text: &str) -> Result<Expanded> {
        if !text.contains("{{") {
            return Ok(Expanded::Keep(Value::String(text.to_string())));
        }

        if let Some(caps) = WHOLE_TOKEN.captures(text) {
            return Ok(match self.resolve(&caps)? {
                Resolution::Found(value) => Expanded::Keep(value),
                Resolution::MissingOptional => Expanded::Remove,
                Resolution::MissingRequired => Expanded::Keep(Value::String(text.to_string())),
            });
        }

        let mut output = String::with_capacity(text.len());
        let mut last = 0;
        for caps in TOKEN.captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            output.push_str(&text[last..whole.start()]);
            match self.resolve(&caps)? {
                Resolution::Found(value) => output.push_str(&stringify(&value)),
                Resolution::MissingOptional => return Ok(Expanded::Remove),
                Resolution::MissingRequired => output.push_str(whole.as_str()),
            }
            last = whole.end();
        }
        output.push_str(&text[last..]);
        Ok(Expanded::Keep(Value::String(output)))
    }

    fn resolve(&self, caps: &Captures<'_>) -> Result<Resolution> {
        let key = caps.get(1).map_or("", |m| m.as_str());
        let modifier = caps.get(2).map(|m| m.as_str());
        let token = caps.get(0).map_or("", |m| m.as_str());

        let transform = match modifier {
            None | Some(OPTIONAL_MODIFIER) => None,
            Some(name) => Some(self.transforms.get(name).ok_or_else(|| {
                SiteError::UnknownTransform {
                    name: name.to_string(),
                    token: token.to_string(),
                    suggestion: self.transforms.suggest(name),
                }
            })?),
        };

        match path::get(self.settings, key) {
            Some(value) => {
                let value = match transform {
                    Some(transform) => (**transform)(key, value, self.settings),
                    None => value.clone(),
                };
                Ok(Resolution::Found(value))
            }
            None if modifier == Some(OPTIONAL_MODIFIER) => Ok(Resolution::MissingOptional),
            None => {
                tracing::debug!("No value for placeholder {token}, leaving it in place");
                Ok(Resolution::MissingRequired)
            }
        }
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(template: Value, settings: Value) -> Result<Value> {
        TokenInterpolator.interpolate(&template, &settings, &TransformRegistry::default())
    }

    #[test]
    fn test_whole_token_preserves_type() {
        let out = run(
            json!({"ids": "{{teams.ids}}", "count": "{{n}}"}),
            json!({"teams": {"ids": ["a", "b"]}, "n": 3}),
        )
        .unwrap();
        assert_eq!(out, json!({"ids": ["a", "b"], "count": 3}));
    }

    #[test]
    fn test_embedded_tokens_stringified() {
        let out = run(
            json!({"title": "Welcome to {{solution.title}} ({{n}})"}),
            json!({"solution": {"title": "Parks"}, "n": 2}),
        )
        .unwrap();
        assert_eq!(out["title"], "Welcome to Parks (2)");
    }

    #[test]
    fn test_missing_optional_removes_field_and_element() {
        let out = run(
            json!({"initiativeId": "{{parent.id:optional}}", "groups": ["{{teams.contentGroupId:optional}}", "fixed"], "keep": 1}),
            json!({}),
        )
        .unwrap();
        assert_eq!(out, json!({"groups": ["fixed"], "keep": 1}));
    }

    #[test]
    fn test_missing_required_left_verbatim() {
        let out = run(json!({"self": "{{appid}}", "url": "/items/{{appid}}/data"}), json!({})).unwrap();
        assert_eq!(out, json!({"self": "{{appid}}", "url": "/items/{{appid}}/data"}));
    }

    #[test]
    fn test_transforms() {
        let out = run(
            json!({"a": "{{name:lowercase}}", "b": "{{name:uppercase}}", "c": "x-{{name:slugify}}"}),
            json!({"name": "Parks Dept"}),
        )
        .unwrap();
        assert_eq!(out, json!({"a": "parks dept", "b": "PARKS DEPT", "c": "x-parks-dept"}));
    }

    #[test]
    fn test_custom_transform_sees_key_and_settings() {
        let mut registry = TransformRegistry::empty();
        registry.register("withOrg", |key, value, settings| {
            json!(format!("{key}:{}:{}", value.as_str().unwrap_or(""), settings["org"].as_str().unwrap_or("")))
        });
        let out = TokenInterpolator
            .interpolate(&json!("{{name:withOrg}}"), &json!({"name": "n", "org": "o"}), &registry)
            .unwrap();
        assert_eq!(out, json!("name:n:o"));
    }

    #[test]
    fn test_unknown_transform_suggests() {
        let err = run(json!("{{name:lowercse}}"), json!({"name": "x"})).unwrap_err();
        match err.downcast_ref::<SiteError>() {
            Some(SiteError::UnknownTransform { name, suggestion, .. }) => {
                assert_eq!(name, "lowercse");
                assert_eq!(suggestion.as_deref(), Some("lowercase"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_string_values_untouched() {
        let template = json!({"n": 1, "b": true, "z": null, "nested": [{"x": 1.5}]});
        assert_eq!(run(template.clone(), json!({})).unwrap(), template);
    }
}
