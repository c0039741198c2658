//! Live document to template conversion.

use anyhow::Result;
use regex::Regex;
use serde_json::{Map, Value, json};
use std::sync::LazyLock;

use super::scrub::scrub_identifier;
use super::{AssetDescriptor, Template};
use crate::collaborators::ResourceStore;
use crate::config::Environment;
use crate::constants::{
    APPID_TOKEN, DRAFT_RESOURCE_PATTERN, SUBDOMAIN_KEYWORD_PREFIX, TEMPLATE_KEY_SUFFIX_LENGTH,
};
use crate::core::{Document, DocumentKind, Item, SCHEMA_VERSION_KEY, SiteError};
use crate::layout::{self, Layout};
use crate::layout::card::SOLUTION_TITLE_TOKEN;
use crate::utils::{random_suffix, slugify};

static DRAFT_RESOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(DRAFT_RESOURCE_PATTERN).expect("draft resource pattern is a valid regex")
});

/// Item fields that carry over into a template.
const PORTABLE_ITEM_FIELDS: [&str; 4] = ["snippet", "description", "culture", "extent"];

/// `data.values` fields tied to the source record's deployment.
const VOLATILE_VALUES: [&str; 11] = [
    "subdomain",
    "defaultHostname",
    "customHostname",
    "internalUrl",
    "clientId",
    "collaborationGroupId",
    "contentGroupId",
    "followersGroupId",
    "updatedAt",
    "updatedBy",
    "uiVersion",
];

/// Deployment facts that shape a template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionContext {
    /// Deployment the template is produced for
    pub environment: Environment,
}

impl ConversionContext {
    /// Item type name for a template made from a document of `kind`.
    #[must_use]
    pub const fn type_name(&self, kind: DocumentKind) -> &'static str {
        match kind {
            DocumentKind::Site => self.environment.site_type(),
            DocumentKind::Page => self.environment.page_type(),
        }
    }
}

/// Convert a live document into a template.
///
/// The result carries no occurrence of the document's identifier outside
/// `itemId`; every reference is replaced with `{{appid}}`.
///
/// # Errors
///
/// Returns [`SiteError::InvalidDocument`] if the document has no `item.id` or a
/// malformed layout, and [`SiteError::CollaboratorFailure`] if the resource listing
/// fails.
pub async fn convert<R>(
    document: &Document,
    context: &ConversionContext,
    resources: &R,
) -> Result<Template>
where
    R: ResourceStore,
{
    let id = document
        .id()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| SiteError::InvalidDocument {
            reason: "cannot convert a document without item.id".to_string(),
        })?
        .to_string();
    let kind = document.kind();
    tracing::info!("Converting {kind} {id} to a template");

    let mut data = document.data.clone();
    strip_volatile_values(&mut data, kind);

    let layout = Layout::from_data(&data).map_err(|err| SiteError::InvalidDocument {
        reason: format!("malformed layout: {err}"),
    })?;
    let (mut dependencies, layout_assets) = match layout {
        Some(layout) => {
            let dependencies = layout::collect_dependencies(&layout);
            let templatized = layout::templatize(&layout);
            templatized.layout.write_to(&mut data)?;
            (dependencies, templatized.assets)
        }
        None => (Vec::new(), Vec::new()),
    };
    if kind == DocumentKind::Site {
        dependencies.extend(linked_page_ids(&data));
    }

    let manifest = resources
        .list_resources(&id)
        .await
        .map_err(|err| SiteError::collaborator("convert", "list resources", err))?;
    let mut assets: Vec<AssetDescriptor> = manifest
        .into_iter()
        .filter(|resource| !DRAFT_RESOURCE.is_match(&resource.name))
        .map(|resource| AssetDescriptor::resource(resource.name))
        .collect();
    for url in layout_assets {
        let asset = AssetDescriptor::layout(url);
        if !assets.iter().any(|existing| existing.name == asset.name) {
            assets.push(asset);
        }
    }

    let item = portable_item(&document.item, context.type_name(kind), document.schema_version());
    // slugify lowercases, so the id is stripped regardless of case
    let key_title =
        document.item.title.to_ascii_lowercase().replace(&id.to_ascii_lowercase(), "");
    let key = format!("{}_{}", slugify(&key_title), random_suffix(TEMPLATE_KEY_SUFFIX_LENGTH));

    let mut dependencies: Vec<String> = scrub_identifier(&dependencies, &id)?;
    dependencies.retain(|dependency| dependency != APPID_TOKEN);
    dedup_preserving_order(&mut dependencies);

    let template = Template {
        template_type: context.type_name(kind).to_string(),
        key,
        item: scrub_identifier(&item, &id)?,
        data: scrub_identifier(&data, &id)?,
        assets: scrub_identifier(&assets, &id)?,
        dependencies,
        item_id: id,
    };
    tracing::debug!(
        "Template {} has {} dependencies and {} assets",
        template.key,
        template.dependencies.len(),
        template.assets.len()
    );
    Ok(template)
}

/// Keep only metadata that makes sense on another organization's record.
fn portable_item(item: &Item, type_name: &str, schema_version: Option<f64>) -> Item {
    let mut properties = Map::new();
    if let Some(version) = schema_version {
        properties.insert(SCHEMA_VERSION_KEY.to_string(), Value::from(version));
    }
    let extra = PORTABLE_ITEM_FIELDS
        .iter()
        .filter_map(|field| item.extra.get(*field).map(|v| ((*field).to_string(), v.clone())))
        .collect();

    Item {
        id: None,
        owner: None,
        title: SOLUTION_TITLE_TOKEN.to_string(),
        item_type: type_name.to_string(),
        tags: item.tags.clone(),
        type_keywords: item
            .type_keywords
            .iter()
            .filter(|keyword| !keyword.starts_with(SUBDOMAIN_KEYWORD_PREFIX))
            .cloned()
            .collect(),
        url: None,
        properties,
        extra,
    }
}

fn strip_volatile_values(data: &mut Value, kind: DocumentKind) {
    let Some(values) = data.get_mut("values").and_then(Value::as_object_mut) else {
        return;
    };
    for field in VOLATILE_VALUES {
        values.remove(field);
    }
    if values.contains_key("title") {
        values.insert("title".to_string(), json!(SOLUTION_TITLE_TOKEN));
    }
    if kind == DocumentKind::Page {
        values.insert("sites".to_string(), json!([]));
    }
}

/// Identifiers of pages linked from a site's `data.values.pages`.
fn linked_page_ids(data: &Value) -> Vec<String> {
    data.pointer("/values/pages")
        .and_then(Value::as_array)
        .map(|pages| {
            pages
                .iter()
                .filter_map(|page| page.get("id").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn dedup_preserving_order(values: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    values.retain(|value| seen.insert(value.clone()));
}
