//! Layout trees of sites and pages.
//!
//! A layout describes the visual composition of a document:
//!
//! ```text
//! Layout
//! ├── header?             (opaque, copied as-is)
//! ├── footer?             (opaque, copied as-is)
//! └── sections[]
//!     ├── style.background?   AssetHolder { fileSrc, cropSrc, cropId }
//!     └── rows[]
//!         └── cards[]
//!             └── component { name, settings }
//! ```
//!
//! Only the fields the walker reasons about are typed. Every level keeps unknown
//! fields in an `extra` map so that templatizing a layout and writing it back does
//! not lose data. Missing arrays deserialize as empty.
//!
//! Card behavior is dispatched on [`CardKind`]; see [`walker`] for traversal and
//! [`pruner`] for stale crop resource cleanup.

pub mod card;
pub mod pruner;
pub mod walker;

pub use card::CardKind;
pub use pruner::{PruneReport, prune_stale_assets, stale_crop_resources};
pub use walker::{
    TemplatizedLayout, collect_assets, collect_crop_ids, collect_dependencies, templatize,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::path;

/// Payload paths that may hold a layout, in lookup order.
const LAYOUT_PATHS: [&str; 2] = ["values.layout", "layout"];

/// Root of a layout tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    /// Header node, never templatized
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<Value>,
    /// Footer node, never templatized
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<Value>,
    /// Page sections in display order
    pub sections: Vec<Section>,
    /// Unknown fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A horizontal band of rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Section {
    /// Rows in display order
    pub rows: Vec<Row>,
    /// Section styling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<SectionStyle>,
    /// Unknown fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Styling of a section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionStyle {
    /// Background image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<AssetHolder>,
    /// Unknown fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A row of cards.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Row {
    /// Cards in display order
    pub cards: Vec<Card>,
    /// Unknown fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A leaf of the layout tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Card {
    /// The component rendered by this card
    pub component: Component,
    /// Unknown fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Component name and its type-specific settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Component {
    /// Discriminator, e.g. `image-card`
    pub name: String,
    /// Type-specific settings
    pub settings: Map<String, Value>,
    /// Unknown fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Pointers to binary resources held by a background or image-like card.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssetHolder {
    /// Source image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_src: Option<String>,
    /// Cropped image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_src: Option<String>,
    /// Identifier embedded in the crop resource name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_id: Option<String>,
    /// Unknown fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AssetHolder {
    /// Read asset pointers out of a card's settings.
    #[must_use]
    pub fn from_settings(settings: &Map<String, Value>) -> Self {
        let text = |key: &str| settings.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            file_src: text("fileSrc"),
            crop_src: text("cropSrc"),
            crop_id: text("cropId"),
            extra: Map::new(),
        }
    }

    /// `fileSrc` then `cropSrc`, skipping absent or empty values.
    #[must_use]
    pub fn assets(&self) -> Vec<String> {
        [&self.file_src, &self.crop_src]
            .into_iter()
            .flatten()
            .filter(|src| !src.is_empty())
            .cloned()
            .collect()
    }

    /// Whether a source image is set.
    #[must_use]
    pub fn has_file_src(&self) -> bool {
        self.file_src.as_deref().is_some_and(|src| !src.is_empty())
    }
}

impl Section {
    /// Background asset holder, if the section has one.
    #[must_use]
    pub fn background(&self) -> Option<&AssetHolder> {
        self.style.as_ref().and_then(|style| style.background.as_ref())
    }
}

impl Card {
    /// Build a card for `name` with the given settings.
    #[must_use]
    pub fn new(name: impl Into<String>, settings: Map<String, Value>) -> Self {
        Self {
            component: Component {
                name: name.into(),
                settings,
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }

    /// The card's kind, from its component name.
    #[must_use]
    pub fn kind(&self) -> CardKind {
        CardKind::from_name(&self.component.name)
    }
}

impl Layout {
    /// Every card in section, row, card order.
    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.sections.iter().flat_map(|s| s.rows.iter()).flat_map(|r| r.cards.iter())
    }

    /// Read the layout out of a document payload.
    ///
    /// Returns `Ok(None)` when the payload has no layout.
    ///
    /// # Errors
    ///
    /// Returns an error if a layout is present but malformed (e.g. `sections` is a string).
    pub fn from_data(data: &Value) -> serde_json::Result<Option<Self>> {
        match Self::locate(data) {
            Some(layout_path) => path::get(data, layout_path)
                .cloned()
                .map(serde_json::from_value)
                .transpose(),
            None => Ok(None),
        }
    }

    /// Write the layout back into a payload, at the path it was read from.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout cannot be serialized.
    pub fn write_to(&self, data: &mut Value) -> serde_json::Result<()> {
        let layout_path = Self::locate(data).unwrap_or(LAYOUT_PATHS[0]);
        path::set(data, layout_path, serde_json::to_value(self)?);
        Ok(())
    }

    fn locate(data: &Value) -> Option<&'static str> {
        LAYOUT_PATHS.into_iter().find(|p| path::get(data, p).is_some_and(Value::is_object))
    }
}
