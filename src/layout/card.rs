//! Per-card behavior, keyed by component name.

use serde_json::{Map, Value, json};
use std::fmt;

/// Placeholder resolving to the parent initiative of a new site.
pub const PARENT_ID_TOKEN: &str = "{{parent.id:optional}}";
/// Placeholder resolving to the new site's title.
pub const SOLUTION_TITLE_TOKEN: &str = "{{solution.title}}";
/// Placeholder resolving to the content team group of a new site.
pub const CONTENT_GROUP_TOKEN: &str = "{{teams.contentGroupId:optional}}";

/// Gallery settings at this version and above keep groups under `query`.
const GALLERY_QUERY_VERSION: f64 = 3.0;

/// The closed set of card types the walker understands.
///
/// Unrecognized component names map to [`CardKind::Other`], which carries no
/// dependencies or assets and is left untouched by templatization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CardKind {
    /// `image-card`
    Image,
    /// `jumbotron-card`
    Jumbotron,
    /// `webmap-card`
    Webmap,
    /// `items/gallery-card`
    ItemGallery,
    /// `summary-statistic-card`
    SummaryStatistic,
    /// `follow-initiative-card`
    FollowInitiative,
    /// Any other component
    Other(String),
}

impl CardKind {
    /// Classify a component name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "image-card" => Self::Image,
            "jumbotron-card" => Self::Jumbotron,
            "webmap-card" => Self::Webmap,
            "items/gallery-card" => Self::ItemGallery,
            "summary-statistic-card" => Self::SummaryStatistic,
            "follow-initiative-card" => Self::FollowInitiative,
            other => Self::Other(other.to_string()),
        }
    }

    /// The component name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Image => "image-card",
            Self::Jumbotron => "jumbotron-card",
            Self::Webmap => "webmap-card",
            Self::ItemGallery => "items/gallery-card",
            Self::SummaryStatistic => "summary-statistic-card",
            Self::FollowInitiative => "follow-initiative-card",
            Self::Other(name) => name.as_str(),
        }
    }

    /// Whether cards of this kind point at image resources.
    #[must_use]
    pub const fn carries_assets(&self) -> bool {
        matches!(self, Self::Image | Self::Jumbotron)
    }

    /// Identifiers of other records this card depends on.
    #[must_use]
    pub fn dependencies(&self, settings: &Map<String, Value>) -> Vec<String> {
        match self {
            Self::Webmap => single_id(settings, "webmap"),
            Self::ItemGallery => settings
                .get("ids")
                .and_then(Value::as_array)
                .map(|ids| {
                    ids.iter()
                        .filter_map(Value::as_str)
                        .filter(|id| !id.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            Self::SummaryStatistic => single_id(settings, "itemId"),
            Self::Image
            | Self::Jumbotron
            | Self::FollowInitiative
            | Self::Other(_) => Vec::new(),
        }
    }

    /// Replace tenant-specific settings with placeholder tokens.
    pub fn templatize(&self, settings: &mut Map<String, Value>) {
        match self {
            Self::FollowInitiative => {
                settings.insert("initiativeId".to_string(), json!(PARENT_ID_TOKEN));
            }
            Self::ItemGallery => {
                let version = settings.get("version").and_then(Value::as_f64);
                if version.is_some_and(|v| v >= GALLERY_QUERY_VERSION) {
                    let query = settings.entry("query").or_insert_with(|| json!({}));
                    if !query.is_object() {
                        *query = json!({});
                    }
                    if let Value::Object(query) = query {
                        query.insert("groups".to_string(), json!([CONTENT_GROUP_TOKEN]));
                    }
                } else {
                    settings.insert(
                        "groups".to_string(),
                        json!([{ "title": SOLUTION_TITLE_TOKEN, "id": CONTENT_GROUP_TOKEN }]),
                    );
                }
            }
            Self::Image
            | Self::Jumbotron
            | Self::Webmap
            | Self::SummaryStatistic
            | Self::Other(_) => {}
        }
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn single_id(settings: &Map<String, Value>, key: &str) -> Vec<String> {
    settings
        .get(key)
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(|id| vec![id.to_string()])
        .unwrap_or_default()
}
