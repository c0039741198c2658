use serde_json::json;
use sitedoc::collaborators::{DocumentStore, StandardHostFormatter, TeamKind};
use sitedoc::config::{Environment, SiteConfig};
use sitedoc::naming::{HostedDomainProbe, KeywordSearchProbe};
use sitedoc::templating::{
    AssetSource, ConversionContext, MaterializeRequest, Materializer, ParentRequest, Template,
    TransformRegistry, convert, create_from_template,
};
use sitedoc::test_utils::{MemoryStore, RecordingProvisioner, fixtures, init_test_logging};

fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert(fixtures::SITE_ID, fixtures::site_with_layout());
    store.insert_resource(fixtures::SITE_ID, "bg.png", b"png");
    store.insert_resource(fixtures::SITE_ID, "hub-image-crop-c1.png", b"png");
    store.insert_resource(fixtures::SITE_ID, "draft-1700000000000.json", b"{}");
    store
}

async fn site_template(store: &MemoryStore) -> Template {
    let site = store.fetch(fixtures::SITE_ID).await.unwrap();
    convert(&site, &ConversionContext::default(), store).await.unwrap()
}

fn hosted_config() -> SiteConfig {
    SiteConfig {
        org_key: Some("cityofx".to_string()),
        org_id: Some("org42".to_string()),
        ..SiteConfig::default()
    }
}

#[tokio::test]
async fn test_convert_scrubs_identifier_everywhere() {
    init_test_logging(None);
    let store = seeded_store();
    let template = site_template(&store).await;

    assert_eq!(template.item_id, fixtures::SITE_ID);
    let mut serialized = serde_json::to_value(&template).unwrap();
    serialized.as_object_mut().unwrap().remove("itemId");
    assert!(!serialized.to_string().contains(fixtures::SITE_ID));
    assert!(serialized.to_string().contains("{{appid}}"));

    assert_eq!(template.dependencies, vec!["map1", "app1", "app2"]);
    assert_eq!(template.data["values"]["title"], "{{solution.title}}");
    assert!(template.data["values"].get("subdomain").is_none());
    assert!(template.data["values"].get("collaborationGroupId").is_none());
    assert!(template.item.properties.get("collaborationGroupId").is_none());
}

#[tokio::test]
async fn test_convert_key_drops_uppercased_identifier() {
    let store = seeded_store();
    let mut site = store.fetch(fixtures::SITE_ID).await.unwrap();
    site.item.title = format!("Copy of {}", fixtures::SITE_ID.to_ascii_uppercase());

    let template = convert(&site, &ConversionContext::default(), &store).await.unwrap();
    assert!(template.key.starts_with("copy-of_"), "unexpected key {}", template.key);

    let mut serialized = serde_json::to_value(&template).unwrap();
    serialized.as_object_mut().unwrap().remove("itemId");
    assert!(!serialized.to_string().to_ascii_lowercase().contains(fixtures::SITE_ID));
}

#[tokio::test]
async fn test_convert_asset_manifest() {
    let store = seeded_store();
    let template = site_template(&store).await;

    let names: Vec<&str> = template.assets.iter().map(|a| a.name.as_str()).collect();
    assert!(!names.iter().any(|n| n.starts_with("draft-")));
    assert_eq!(names.iter().filter(|n| **n == "bg.png").count(), 1);
    assert!(names.contains(&"c2.png"));
    assert!(names.contains(&"hub-image-crop-c2.png"));

    let from_layout = template.assets.iter().find(|a| a.name == "c2.png").unwrap();
    assert_eq!(from_layout.source, AssetSource::Layout);
    assert!(from_layout.url.as_deref().unwrap().contains("/items/{{appid}}/"));
}

#[tokio::test]
async fn test_instantiate_hosted_with_teams_and_parent() {
    let store = seeded_store();
    let template = site_template(&store).await;
    store.register_hostname("trails-cityofx.hub.arcgis.com", "someone-else");

    let config = hosted_config();
    let formatter = StandardHostFormatter::from_config(&config);
    let probe = HostedDomainProbe::new(&config, &store, &formatter).unwrap();
    let provisioner = RecordingProvisioner::new();
    let materializer = Materializer::new(&config, &provisioner, &probe, &formatter);
    let request = MaterializeRequest {
        teams: vec![TeamKind::Core, TeamKind::Content],
        parent: Some(ParentRequest {
            item_type: "Hub Initiative".to_string(),
            tags: vec![],
        }),
        ..MaterializeRequest::titled("Trails")
    };

    let created = create_from_template(&store, &materializer, &template, &request, &TransformRegistry::default())
        .await
        .unwrap();

    assert_eq!(created.subdomain, "trails-1");
    assert_eq!(created.hostname, "trails-1-cityofx.hub.arcgis.com");
    assert_eq!(created.parent_id.as_deref(), Some("parent1"));

    let id = created.document.id().unwrap().to_string();
    let stored = store.get(&id).unwrap();
    assert_eq!(stored, created.document);

    let text = serde_json::to_string(&stored).unwrap();
    assert!(!text.contains("{{appid}}"));
    assert!(text.contains(&format!("/items/{id}/resources/bg.png")));

    assert_eq!(stored.item.title, "Trails");
    assert_eq!(stored.item.url.as_deref(), Some("https://trails-1-cityofx.hub.arcgis.com"));
    assert!(stored.item.type_keywords.contains(&"hubsubdomain|trails-1".to_string()));
    assert!(!stored.item.type_keywords.contains(&"hubsubdomain|parks".to_string()));
    assert_eq!(stored.item.properties["contentGroupId"], "content-team");
    assert_eq!(stored.item.properties["parentId"], "parent1");
    assert_eq!(stored.data_get("values.title"), Some(&json!("Trails")));
    assert_eq!(stored.data_get("values.subdomain"), Some(&json!("trails-1")));

    let cards = &stored.data["values"]["layout"]["sections"][0]["rows"][0]["cards"];
    assert_eq!(cards[1]["component"]["settings"]["initiativeId"], "parent1");
    let gallery = &stored.data["values"]["layout"]["sections"][1]["rows"][1]["cards"][0];
    assert_eq!(gallery["component"]["settings"]["query"]["groups"], json!(["content-team"]));

    // Feeds are not interpolated
    assert_eq!(stored.data_get("feeds.dcatUS11.identifier"), Some(&json!("{{item.id}}")));
}

#[tokio::test]
async fn test_instantiate_self_managed_without_teams() {
    let store = seeded_store();
    let template = site_template(&store).await;

    let config = SiteConfig {
        environment: Environment::SelfManaged,
        portal_hostname: Some("maps.cityofx.gov".to_string()),
        ..SiteConfig::default()
    };
    let formatter = StandardHostFormatter::from_config(&config);
    let probe = KeywordSearchProbe::new(&store);
    let provisioner = RecordingProvisioner::new();
    let materializer = Materializer::new(&config, &provisioner, &probe, &formatter);

    let created = create_from_template(
        &store,
        &materializer,
        &template,
        &MaterializeRequest::titled("Parks"),
        &TransformRegistry::default(),
    )
    .await
    .unwrap();

    assert_eq!(created.subdomain, "parks-1");
    assert_eq!(created.hostname, "maps.cityofx.gov/apps/sites/#/parks-1");
    assert!(provisioner.calls().is_empty());

    let stored = store.get(created.document.id().unwrap()).unwrap();
    let cards = &stored.data["values"]["layout"]["sections"][0]["rows"][0]["cards"];
    assert!(cards[1]["component"]["settings"].get("initiativeId").is_none());
    let gallery = &stored.data["values"]["layout"]["sections"][1]["rows"][1]["cards"][0];
    assert_eq!(gallery["component"]["settings"]["query"]["groups"], json!([]));
}
