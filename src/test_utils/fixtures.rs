//! Document fixtures.
//!
//! Each fixture is a realistic record as the platform would store it. Identifiers
//! are fixed so assertions can refer to them.

use serde_json::{Value, json};

use crate::core::{Document, Item};
use crate::templating::{AssetDescriptor, Template};

/// Identifier used by [`site_with_layout`].
pub const SITE_ID: &str = "9a1f2e3d4c5b6a7980f1e2d3c4b5a697";

/// A site saved before schema versioning: comma-separated groups, a mixed-case
/// subdomain and a Google Analytics code.
#[must_use]
pub fn legacy_site() -> Document {
    document(json!({
        "item": {
            "title": "Parks & Recreation",
            "type": "Hub Site Application",
            "typeKeywords": ["hubSite", "hubsubdomain|parks"],
            "properties": {}
        },
        "data": {
            "values": {
                "title": "Parks & Recreation",
                "subdomain": "Parks",
                "defaultHostname": "Parks-CityOfX.hub.arcgis.com",
                "groups": "0f1e2d3c4b5a69788796a5b4c3d2e1f0,not-a-guid",
                "gacode": "UA-1234-1",
                "dcatConfig": {"title": "{{default.name}}"}
            }
        }
    }))
}

/// A current site whose layout has a background, an image card with a crop, a
/// webmap, a gallery and a follow card.
#[must_use]
pub fn site_with_layout() -> Document {
    document(json!({
        "item": {
            "id": SITE_ID,
            "owner": "casey",
            "title": "Parks",
            "type": "Hub Site Application",
            "snippet": "City parks and trails",
            "tags": ["parks"],
            "typeKeywords": ["hubSite", "hubsubdomain|parks"],
            "url": "https://parks-cityofx.hub.arcgis.com",
            "properties": {"schemaVersion": 1.5, "collaborationGroupId": "core0"}
        },
        "data": {
            "values": {
                "title": "Parks",
                "subdomain": "parks",
                "defaultHostname": "parks-cityofx.hub.arcgis.com",
                "clientId": "client0",
                "collaborationGroupId": "core0",
                "contentGroupId": "content0",
                "layout": layout_with_crops(&["c1", "c2"])
            },
            "catalog": {"groups": ["0f1e2d3c4b5a69788796a5b4c3d2e1f0"]},
            "feeds": {"dcatUS11": {"title": "{{default.name}}", "identifier": "{{item.id}}"}}
        }
    }))
}

/// A layout whose image cards carry the given crop ids.
#[must_use]
pub fn layout_with_crops(crop_ids: &[&str]) -> Value {
    let image_cards: Vec<Value> = crop_ids
        .iter()
        .map(|crop| {
            json!({"component": {"name": "image-card", "settings": {
                "fileSrc": format!("https://x.org/items/{SITE_ID}/resources/{crop}.png"),
                "cropSrc": format!("https://x.org/items/{SITE_ID}/resources/hub-image-crop-{crop}.png"),
                "cropId": crop
            }}})
        })
        .collect();

    json!({
        "header": {"component": {"name": "site-header", "settings": {"title": "Parks"}}},
        "sections": [
            {
                "style": {"background": {"fileSrc": format!("https://x.org/items/{SITE_ID}/resources/bg.png")}},
                "rows": [{"cards": [
                    {"component": {"name": "webmap-card", "settings": {"webmap": "map1"}}},
                    {"component": {"name": "follow-initiative-card", "settings": {"initiativeId": "init0"}}}
                ]}]
            },
            {
                "rows": [
                    {"cards": image_cards},
                    {"cards": [{"component": {"name": "items/gallery-card", "settings": {"ids": ["app1", "app2"], "version": 3}}}]}
                ]
            }
        ]
    })
}

/// A page template with placeholders for the title, teams and organization.
#[must_use]
pub fn page_template() -> Template {
    Template {
        template_type: "Hub Page".to_string(),
        key: "about_abcdefgh".to_string(),
        item_id: "p0".to_string(),
        item: Item {
            title: "{{solution.title}}".to_string(),
            item_type: "Hub Page".to_string(),
            type_keywords: vec!["hubPage".to_string()],
            ..Item::default()
        },
        data: json!({
            "values": {
                "title": "{{solution.title}}",
                "orgId": "{{organization.id:optional}}",
                "self": "/items/{{appid}}/data",
                "layout": {"sections": [{"rows": [{"cards": [
                    {"component": {"name": "follow-initiative-card", "settings": {"initiativeId": "{{parent.id:optional}}"}}}
                ]}]}]}
            }
        }),
        dependencies: Vec::new(),
        assets: vec![AssetDescriptor::resource("logo.png")],
    }
}

fn document(value: Value) -> Document {
    match Document::from_value(value) {
        Ok(document) => document,
        Err(err) => panic!("fixture is not a valid document: {err}"),
    }
}
