use serde_json::json;
use sitedoc::constants::SCHEMA_HEAD_VERSION;
use sitedoc::core::Document;
use sitedoc::migration::{Migration, MigrationChain, upgrade};
use sitedoc::test_utils::fixtures;
use std::borrow::Cow;

#[test]
fn test_legacy_site_reaches_head() {
    let legacy = fixtures::legacy_site();
    let current = upgrade(&legacy);

    assert_eq!(current.schema_version(), Some(SCHEMA_HEAD_VERSION));
    assert_eq!(current.data_get("values.subdomain"), Some(&json!("parks")));
    assert_eq!(current.data_get("values.defaultHostname"), Some(&json!("parks-cityofx.hub.arcgis.com")));
    assert_eq!(current.data_get("catalog.groups"), Some(&json!(["0f1e2d3c4b5a69788796a5b4c3d2e1f0"])));
    assert!(current.data_get("values.groups").is_none());

    assert_eq!(
        current.data_get("values.telemetry.customAnalytics.ga.customerTracker"),
        Some(&json!({"enabled": true, "id": "UA-1234-1"}))
    );
    assert!(current.data_get("values.gacode").is_none());

    assert_eq!(current.data_get("feeds.dcatUS11"), Some(&json!({"title": "{{default.name}}"})));
    assert!(current.data_get("values.dcatConfig").is_none());

    // Input untouched
    assert_eq!(legacy.schema_version(), None);
    assert_eq!(legacy.data_get("values.subdomain"), Some(&json!("Parks")));
}

#[test]
fn test_upgrade_is_idempotent_by_reference() {
    let once = upgrade(&fixtures::legacy_site()).into_owned();
    match upgrade(&once) {
        Cow::Borrowed(same) => assert!(std::ptr::eq(same, &once)),
        Cow::Owned(_) => panic!("upgrading a current document must not copy it"),
    }
}

#[test]
fn test_mixed_group_entries() {
    let doc = Document::from_value(json!({
        "item": {"title": "Parks", "type": "Hub Site Application"},
        "data": {"values": {"groups": ["4bc", {"id": "fromObj"}, "54b"]}}
    }))
    .unwrap();

    let current = upgrade(&doc);
    assert!(current.schema_version().unwrap() >= 1.4);
    assert_eq!(current.data_get("catalog.groups"), Some(&json!([])));
    assert!(current.data_get("values.telemetry").is_some());
}

#[test]
fn test_current_site_fixture_is_left_alone() {
    let site = fixtures::site_with_layout();
    assert!(matches!(upgrade(&site), Cow::Borrowed(_)));
}

#[test]
fn test_custom_step_extends_chain() {
    fn stamp(document: &mut Document) {
        document.data_set("values.stamped", json!(true));
    }

    let chain = MigrationChain::standard().with_step(Migration::Custom {
        target: 1.6,
        name: "stamp",
        apply: stamp,
    });
    let site = fixtures::site_with_layout();
    let upgraded = chain.upgrade(&site);

    assert_eq!(upgraded.schema_version(), Some(1.6));
    assert_eq!(upgraded.data_get("values.stamped"), Some(&json!(true)));
    assert_eq!(upgraded.data_get("catalog"), site.data_get("catalog"));
}
