use anyhow::Result;
use serde_json::json;
use sitedoc::collaborators::{ExistenceProbe, StandardHostFormatter, TeamKind};
use sitedoc::config::SiteConfig;
use sitedoc::core::SiteError;
use sitedoc::templating::{
    MaterializeRequest, Materializer, ParentRequest, TransformRegistry, create_from_template,
};
use sitedoc::test_utils::{MemoryStore, ProvisionCall, RecordingProvisioner, fixtures};

struct NothingTaken;

impl ExistenceProbe for NothingTaken {
    async fn exists(&self, _candidate: &str) -> Result<bool> {
        Ok(false)
    }
}

struct ProbeDown;

impl ExistenceProbe for ProbeDown {
    async fn exists(&self, _candidate: &str) -> Result<bool> {
        anyhow::bail!("domain service unavailable")
    }
}

struct EverythingTaken;

impl ExistenceProbe for EverythingTaken {
    async fn exists(&self, _candidate: &str) -> Result<bool> {
        Ok(true)
    }
}

fn failed_step(err: &anyhow::Error) -> String {
    match err.downcast_ref::<SiteError>() {
        Some(SiteError::CollaboratorFailure { step, .. }) => step.clone(),
        other => panic!("expected a collaborator failure, got {other:?}"),
    }
}

fn team_request(title: &str) -> MaterializeRequest {
    MaterializeRequest {
        teams: vec![TeamKind::Core, TeamKind::Content],
        ..MaterializeRequest::titled(title)
    }
}

#[tokio::test]
async fn test_team_failure_names_step_and_creates_nothing() {
    let store = MemoryStore::new();
    let config = SiteConfig::default();
    let formatter = StandardHostFormatter::from_config(&config);
    let provisioner = RecordingProvisioner::new().failing("create_teams");
    let materializer = Materializer::new(&config, &provisioner, &NothingTaken, &formatter);

    let err = create_from_template(
        &store,
        &materializer,
        &fixtures::page_template(),
        &team_request("About"),
        &TransformRegistry::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(failed_step(&err), "create teams");
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_probe_failure_is_reported_as_allocation() {
    let store = MemoryStore::new();
    let config = SiteConfig::default();
    let formatter = StandardHostFormatter::from_config(&config);
    let provisioner = RecordingProvisioner::new();
    let materializer = Materializer::new(&config, &provisioner, &ProbeDown, &formatter);

    let err = materializer
        .materialize(&fixtures::page_template(), &team_request("About"), &TransformRegistry::default())
        .await
        .unwrap_err();

    assert_eq!(failed_step(&err), "allocate subdomain");
    // Teams were provisioned before the failure and are not rolled back
    assert!(matches!(provisioner.calls()[0], ProvisionCall::CreateTeams { .. }));
}

#[tokio::test]
async fn test_exhausted_allocation_is_a_validation_error() {
    let config = SiteConfig {
        max_probe_steps: 3,
        ..SiteConfig::default()
    };
    let formatter = StandardHostFormatter::from_config(&config);
    let provisioner = RecordingProvisioner::new();
    let materializer = Materializer::new(&config, &provisioner, &EverythingTaken, &formatter);

    let err = materializer
        .materialize(
            &fixtures::page_template(),
            &MaterializeRequest::titled("About"),
            &TransformRegistry::default(),
        )
        .await
        .unwrap_err();

    let site_err = err.downcast_ref::<SiteError>().unwrap();
    assert!(matches!(site_err, SiteError::ProbeLimitExceeded { .. }), "got {site_err:?}");
    assert!(site_err.is_validation());
}

#[tokio::test]
async fn test_tag_failures_do_not_abort() {
    let store = MemoryStore::new();
    let config = SiteConfig::default();
    let formatter = StandardHostFormatter::from_config(&config);
    let provisioner = RecordingProvisioner::new().failing("tag_team");
    let materializer = Materializer::new(&config, &provisioner, &NothingTaken, &formatter);
    let request = MaterializeRequest {
        parent: Some(ParentRequest {
            item_type: "Hub Initiative".to_string(),
            tags: vec!["parks".to_string()],
        }),
        ..team_request("About")
    };

    let created = create_from_template(
        &store,
        &materializer,
        &fixtures::page_template(),
        &request,
        &TransformRegistry::default(),
    )
    .await
    .unwrap();

    let calls = provisioner.calls();
    let tags: Vec<_> = calls.iter().filter(|c| matches!(c, ProvisionCall::Tag { .. })).collect();
    assert_eq!(tags.len(), 2);
    assert!(tags.iter().all(|c| matches!(c, ProvisionCall::Tag { tag, .. } if tag == "parent|parent1")));

    let shares: Vec<_> = calls.iter().filter(|c| matches!(c, ProvisionCall::Share { .. })).collect();
    assert_eq!(shares.len(), 2);

    let id = created.document.id().unwrap();
    assert_eq!(created.document.data_get("values.self"), Some(&json!(format!("/items/{id}/data"))));
    let card = &created.document.data["values"]["layout"]["sections"][0]["rows"][0]["cards"][0];
    assert_eq!(card["component"]["settings"]["initiativeId"], "parent1");
}

#[tokio::test]
async fn test_share_failure_leaves_record_in_place() {
    let store = MemoryStore::new();
    let config = SiteConfig::default();
    let formatter = StandardHostFormatter::from_config(&config);
    let provisioner = RecordingProvisioner::new().failing_for_group("content-team");
    let materializer = Materializer::new(&config, &provisioner, &NothingTaken, &formatter);

    let err = create_from_template(
        &store,
        &materializer,
        &fixtures::page_template(),
        &team_request("About"),
        &TransformRegistry::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(failed_step(&err), "share record");
    assert_eq!(store.len(), 1);
    let stored = store.get("doc1").unwrap();
    assert_eq!(stored.data_get("values.self"), Some(&json!("/items/doc1/data")));
}

#[tokio::test]
async fn test_settings_and_organization_reach_placeholders() {
    let config = SiteConfig {
        org_id: Some("org42".to_string()),
        ..SiteConfig::default()
    };
    let formatter = StandardHostFormatter::from_config(&config);
    let provisioner = RecordingProvisioner::new();
    let materializer = Materializer::new(&config, &provisioner, &NothingTaken, &formatter);

    let mut template = fixtures::page_template();
    template.data["values"]["greeting"] = json!("{{welcome:uppercase}}, {{solution.title}}");
    let request = MaterializeRequest {
        settings: json!({"welcome": "hello", "solution": {"title": "ignored"}}),
        ..MaterializeRequest::titled("About Us")
    };

    let materialized =
        materializer.materialize(&template, &request, &TransformRegistry::default()).await.unwrap();
    let values = &materialized.document.data["values"];
    assert_eq!(values["greeting"], "HELLO, About Us");
    assert_eq!(values["orgId"], "org42");
    assert_eq!(values["self"], "/items/{{appid}}/data");
    assert_eq!(materialized.subdomain, "about-us");
}

#[tokio::test]
async fn test_unknown_transform_fails_with_suggestion() {
    let config = SiteConfig::default();
    let formatter = StandardHostFormatter::from_config(&config);
    let provisioner = RecordingProvisioner::new();
    let materializer = Materializer::new(&config, &provisioner, &NothingTaken, &formatter);

    let mut template = fixtures::page_template();
    template.data["values"]["slug"] = json!("{{solution.title:slugfy}}");

    let err = materializer
        .materialize(&template, &MaterializeRequest::titled("About"), &TransformRegistry::default())
        .await
        .unwrap_err();
    match err.downcast_ref::<SiteError>() {
        Some(SiteError::UnknownTransform { suggestion, .. }) => {
            assert_eq!(suggestion.as_deref(), Some("slugify"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
