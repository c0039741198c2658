//! The document model shared by every component.
//!
//! A [`Document`] is the persisted unit of content: an [`Item`] carrying metadata and
//! a free-form JSON `data` payload. Only the metadata fields sitedoc reasons about
//! are typed; everything else is preserved verbatim through `extra` maps so that a
//! read-modify-write cycle never drops fields it does not understand.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::utils::path;

/// Property key holding the schema version inside `item.properties`.
pub const SCHEMA_VERSION_KEY: &str = "schemaVersion";

/// Item metadata for a site or page record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Store identifier, absent until the record is created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Owning user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Display title
    #[serde(default)]
    pub title: String,
    /// Item type name, e.g. "Hub Site Application"
    #[serde(rename = "type", default)]
    pub item_type: String,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Machine-readable keywords such as `hubsubdomain|<name>`
    #[serde(default)]
    pub type_keywords: Vec<String>,
    /// Public URL of the record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Free-form property bag, including `schemaVersion`
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Every other metadata field, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A site or page record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Item metadata
    pub item: Item,
    /// Free-form payload (`values`, `layout`, `catalog`, `feeds`, ...)
    #[serde(default = "empty_object")]
    pub data: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Whether a document is a site or one of its pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// A site record, the root of a layout hierarchy
    Site,
    /// A page record linked from one or more sites
    Page,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Site => write!(f, "site"),
            Self::Page => write!(f, "page"),
        }
    }
}

impl Document {
    /// Create a document from item metadata and a payload.
    #[must_use]
    pub const fn new(item: Item, data: Value) -> Self {
        Self {
            item,
            data,
        }
    }

    /// The store identifier, if the record has been created.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.item.id.as_deref()
    }

    /// Classify the document from its item type.
    ///
    /// Types ending in `Page` are pages; everything else is treated as a site.
    #[must_use]
    pub fn kind(&self) -> DocumentKind {
        if self.item.item_type.trim_end().ends_with("Page") {
            DocumentKind::Page
        } else {
            DocumentKind::Site
        }
    }

    /// Current schema version, `None` for documents that predate versioning.
    #[must_use]
    pub fn schema_version(&self) -> Option<f64> {
        self.item.properties.get(SCHEMA_VERSION_KEY).and_then(Value::as_f64)
    }

    /// Record a schema version in `item.properties`.
    pub fn set_schema_version(&mut self, version: f64) {
        self.item.properties.insert(SCHEMA_VERSION_KEY.to_string(), Value::from(version));
    }

    /// Read a value from the payload by dotted path.
    #[must_use]
    pub fn data_get(&self, data_path: &str) -> Option<&Value> {
        path::get(&self.data, data_path)
    }

    /// Write a value into the payload by dotted path, creating objects as needed.
    pub fn data_set(&mut self, data_path: &str, value: Value) {
        path::set(&mut self.data, data_path, value);
    }

    /// Remove a value from the payload by dotted path.
    pub fn data_delete(&mut self, data_path: &str) -> Option<Value> {
        path::delete(&mut self.data, data_path)
    }

    /// Add a type keyword unless it is already present.
    pub fn add_type_keyword(&mut self, keyword: impl Into<String>) {
        let keyword = keyword.into();
        if !self.item.type_keywords.contains(&keyword) {
            self.item.type_keywords.push(keyword);
        }
    }

    /// Serialize the document as a single JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if a field cannot be represented as JSON.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Build a document from a JSON value of the shape `{ item, data }`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not have a usable `item`.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}
