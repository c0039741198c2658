//! Conversion between live documents and tenant-agnostic templates.
//!
//! # Overview
//!
//! A live site or page belongs to one organization: its payload is full of that
//! organization's identifiers, team groups, hostnames and resource URLs. A
//! [`Template`] is the same document with all of that removed or replaced by
//! placeholder tokens, so it can be instantiated again elsewhere.
//!
//! ```text
//!             convert()                           materialize()
//!  Document ───────────────▶ Template ───────────────────────────▶ Document
//!   id: abc123               itemId: abc123                         id: <new>
//!   "…/items/abc123/…"       "…/items/{{appid}}/…"                  "…/items/{{appid}}/…"
//!   title: Parks             title: {{solution.title}}              title: Trails
//!                                                       finalize_identifier()
//!                                                      ─────────────────────▶ "…/items/<new>/…"
//! ```
//!
//! # Modules
//!
//! - [`converter`]: live document to template
//! - [`materializer`]: template to new live document, plus the create flow
//! - [`interpolate`]: `{{path}}` token expansion
//! - [`scrub`]: the textual identifier substitution both directions rely on

pub mod converter;
pub mod interpolate;
pub mod materializer;
pub mod scrub;

pub use converter::{ConversionContext, convert};
pub use interpolate::{Interpolator, TokenInterpolator, TransformFn, TransformRegistry};
pub use materializer::{
    MaterializeRequest, MaterializedDocument, Materializer, ParentRequest, create_from_template,
    finalize_identifier,
};
pub use scrub::{restore_identifier, scrub_identifier};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::Item;

/// Where an asset in a template's manifest was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetSource {
    /// A resource attached to the record
    Resource,
    /// A URL referenced from the layout
    Layout,
}

/// An entry in a template's asset manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// File name of the asset
    pub name: String,
    /// Source URL, for layout assets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Where the asset was found
    pub source: AssetSource,
}

impl AssetDescriptor {
    /// Descriptor for a resource attached to the record.
    #[must_use]
    pub fn resource(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
            source: AssetSource::Resource,
        }
    }

    /// Descriptor for a URL referenced by the layout, named after its last path segment.
    #[must_use]
    pub fn layout(url: impl Into<String>) -> Self {
        let url = url.into();
        let without_query = url.split(['?', '#']).next().unwrap_or_default();
        let name = without_query.rsplit('/').next().unwrap_or_default().to_string();
        Self {
            name,
            url: Some(url),
            source: AssetSource::Layout,
        }
    }
}

/// A tenant-agnostic document ready to be instantiated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Item type of records created from this template
    #[serde(rename = "type")]
    pub template_type: String,
    /// Unique template key, `<slug>_<random>`
    pub key: String,
    /// Identifier of the document the template was made from
    pub item_id: String,
    /// Portable item metadata
    pub item: Item,
    /// Payload with placeholders
    pub data: Value,
    /// Records the template depends on
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Binary assets to carry along
    #[serde(default)]
    pub assets: Vec<AssetDescriptor>,
}

/// Recursively merge `overrides` into `base`.
///
/// Objects are merged key by key; any other value in `overrides` replaces the one
/// in `base`.
#[must_use]
pub fn deep_merge_json(mut base: Value, overrides: &Value) -> Value {
    match (base.as_object_mut(), overrides.as_object()) {
        (Some(base_obj), Some(override_obj)) => {
            for (key, override_value) in override_obj {
                match base_obj.get_mut(key) {
                    Some(base_value) if base_value.is_object() && override_value.is_object() => {
                        let merged = deep_merge_json(base_value.take(), override_value);
                        *base_value = merged;
                    }
                    _ => {
                        base_obj.insert(key.clone(), override_value.clone());
                    }
                }
            }
            base
        }
        _ => overrides.clone(),
    }
}
