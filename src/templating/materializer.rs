//! Template to live document instantiation.
//!
//! [`Materializer::materialize`] turns a [`Template`] into a new document that has
//! not been stored yet:
//!
//! 1. Strip team and initiative linkage carried over from the source record
//! 2. Provision team groups, if requested
//! 3. Allocate a unique subdomain from the title
//! 4. Compose hostname and URL
//! 5. Create a parent record, if requested, and tag the teams with it
//! 6. Interpolate `{item, data}` against the settings context (`data.feeds` excluded)
//! 7. Stamp subdomain, hostname, URL, subdomain keyword and schema version
//!
//! A collaborator failure in steps 2 to 5 is reported as
//! [`SiteError::CollaboratorFailure`]. Side effects that already happened (teams
//! created, parent record created) are not rolled back.
//!
//! [`create_from_template`] runs the full flow: materialize, store, replace
//! `{{appid}}` with the new identifier, store again, and share the record with the
//! created teams.

use anyhow::Result;
use serde_json::{Map, Value, json};

use super::interpolate::{Interpolator, TokenInterpolator, TransformRegistry};
use super::scrub::restore_identifier;
use super::{Template, deep_merge_json};
use crate::collaborators::fanout::warn_failures;
use crate::collaborators::{
    DocumentStore, ExistenceProbe, HostFormatter, Provisioner, SubRecordRequest, TeamKind,
    TeamRequest, TeamsCreated, join_best_effort, join_strict,
};
use crate::config::SiteConfig;
use crate::constants::SCHEMA_HEAD_VERSION;
use crate::core::{Document, Item, SiteError};
use crate::naming::{NameLimits, allocate_with_probe, subdomain_keyword};
use crate::utils::subdomain_seed;

const FLOW: &str = "materialize";

/// Linkage fields that point at the source record's teams and initiative.
const LINKAGE_FIELDS: [&str; 6] = [
    "collaborationGroupId",
    "contentGroupId",
    "followersGroupId",
    "parentInitiativeId",
    "initiativeId",
    "parentId",
];

/// Parent record to create next to the new document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentRequest {
    /// Item type of the parent record
    pub item_type: String,
    /// Extra tags on the parent record
    pub tags: Vec<String>,
}

/// What to instantiate.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializeRequest {
    /// Title of the new document
    pub title: String,
    /// User settings, merged under the computed context
    pub settings: Value,
    /// Teams to provision; empty for none
    pub teams: Vec<TeamKind>,
    /// Parent record to create, if any
    pub parent: Option<ParentRequest>,
}

impl MaterializeRequest {
    /// A request with only a title.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            settings: json!({}),
            teams: Vec::new(),
            parent: None,
        }
    }
}

/// A new, unsaved document plus the side effects that produced it.
#[derive(Debug, Clone)]
pub struct MaterializedDocument {
    /// The document to store
    pub document: Document,
    /// Allocated subdomain
    pub subdomain: String,
    /// Composed hostname
    pub hostname: String,
    /// Teams provisioned for the document
    pub teams: TeamsCreated,
    /// Identifier of the created parent record
    pub parent_id: Option<String>,
}

/// Instantiates templates using the configured collaborators.
#[derive(Debug)]
pub struct Materializer<'a, P, E, H, I = TokenInterpolator> {
    config: &'a SiteConfig,
    provisioner: &'a P,
    probe: &'a E,
    formatter: &'a H,
    interpolator: I,
}

impl<'a, P, E, H> Materializer<'a, P, E, H>
where
    P: Provisioner,
    E: ExistenceProbe,
    H: HostFormatter,
{
    /// Create a materializer using [`TokenInterpolator`].
    pub const fn new(config: &'a SiteConfig, provisioner: &'a P, probe: &'a E, formatter: &'a H) -> Self {
        Self {
            config,
            provisioner,
            probe,
            formatter,
            interpolator: TokenInterpolator,
        }
    }
}

impl<'a, P, E, H, I> Materializer<'a, P, E, H, I>
where
    P: Provisioner,
    E: ExistenceProbe,
    H: HostFormatter,
    I: Interpolator,
{
    /// Replace the interpolator.
    pub fn with_interpolator<J: Interpolator>(self, interpolator: J) -> Materializer<'a, P, E, H, J> {
        Materializer {
            config: self.config,
            provisioner: self.provisioner,
            probe: self.probe,
            formatter: self.formatter,
            interpolator,
        }
    }

    /// The provisioner used for teams, parents and sharing.
    pub const fn provisioner(&self) -> &P {
        self.provisioner
    }

    /// Build a new document from `template`.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::CollaboratorFailure`] if provisioning, subdomain allocation
    /// or parent creation fails, and [`SiteError::UnknownTransform`] if the template uses
    /// an unregistered transform.
    pub async fn materialize(
        &self,
        template: &Template,
        request: &MaterializeRequest,
        transforms: &TransformRegistry,
    ) -> Result<MaterializedDocument> {
        tracing::info!("Materializing template {} as '{}'", template.key, request.title);

        let mut item = template.item.clone();
        let mut data = template.data.clone();
        strip_linkage(&mut item, &mut data);

        let teams = self.provision_teams(request).await?;
        for (property, group_id) in &teams.identifiers {
            item.properties.insert(property.clone(), json!(group_id));
        }

        let seed = subdomain_seed(&request.title);
        let subdomain = allocate_with_probe(&seed, self.probe, NameLimits::from_config(self.config))
            .await
            .map_err(|err| {
                if err.downcast_ref::<SiteError>().is_some_and(SiteError::is_validation) {
                    err
                } else {
                    SiteError::collaborator(FLOW, "allocate subdomain", err).into()
                }
            })?;
        let hostname = self.formatter.hostname(&subdomain);
        let url = self.formatter.site_url(&hostname);
        tracing::debug!("Allocated subdomain {subdomain} ({hostname})");

        let parent_id = match &request.parent {
            Some(parent) => Some(self.create_parent(request, parent, &teams).await?),
            None => None,
        };
        if let Some(parent_id) = &parent_id {
            item.properties.insert("parentId".to_string(), json!(parent_id));
            crate::utils::path::set(&mut data, "values.parentId", json!(parent_id));
        }

        let feeds = data.as_object_mut().and_then(|fields| fields.remove("feeds"));

        let settings = self.settings_context(request, &teams, parent_id.as_deref());
        let interpolated = self.interpolator.interpolate(
            &json!({ "item": item, "data": data }),
            &settings,
            transforms,
        )?;
        let mut document = Document::from_value(interpolated).map_err(|err| SiteError::InvalidDocument {
            reason: format!("interpolation produced an unusable document: {err}"),
        })?;

        if let Some(feeds) = feeds {
            document.data_set("feeds", feeds);
        }
        document.data_set("values.subdomain", json!(subdomain));
        document.data_set("values.defaultHostname", json!(hostname));
        document.item.title.clone_from(&request.title);
        document.item.url = Some(url);
        document.add_type_keyword(subdomain_keyword(&subdomain));
        document.set_schema_version(SCHEMA_HEAD_VERSION);

        Ok(MaterializedDocument {
            document,
            subdomain,
            hostname,
            teams,
            parent_id,
        })
    }

    async fn provision_teams(&self, request: &MaterializeRequest) -> Result<TeamsCreated> {
        if request.teams.is_empty() {
            return Ok(TeamsCreated::default());
        }
        let team_request = TeamRequest {
            title: request.title.clone(),
            kinds: request.teams.clone(),
        };
        let teams = self
            .provisioner
            .create_teams(&team_request)
            .await
            .map_err(|err| SiteError::collaborator(FLOW, "create teams", err))?;
        tracing::debug!("Provisioned {} team(s)", teams.records.len());
        Ok(teams)
    }

    async fn create_parent(
        &self,
        request: &MaterializeRequest,
        parent: &ParentRequest,
        teams: &TeamsCreated,
    ) -> Result<String> {
        let sub_request = SubRecordRequest {
            title: request.title.clone(),
            item_type: parent.item_type.clone(),
            tags: parent.tags.clone(),
        };
        let record = self
            .provisioner
            .create_sub_record(&sub_request)
            .await
            .map_err(|err| SiteError::collaborator(FLOW, "create parent record", err))?;
        let parent_id = record.id().map(str::to_string).ok_or_else(|| {
            SiteError::collaborator(
                FLOW,
                "create parent record",
                anyhow::anyhow!("provisioner returned a record without an id"),
            )
        })?;

        let tag = format!("parent|{parent_id}");
        let outcomes = join_best_effort(
            teams.records.iter().map(|team| self.provisioner.tag_team(&team.id, &tag)),
        )
        .await;
        warn_failures("Failed to tag team with parent", &outcomes);

        Ok(parent_id)
    }

    /// User settings overlaid with `solution`, `teams`, `parent` and `organization`.
    fn settings_context(
        &self,
        request: &MaterializeRequest,
        teams: &TeamsCreated,
        parent_id: Option<&str>,
    ) -> Value {
        let mut computed = Map::new();
        computed.insert("solution".to_string(), json!({ "title": request.title }));
        computed.insert("teams".to_string(), json!(teams.identifiers));
        if let Some(parent_id) = parent_id {
            computed.insert("parent".to_string(), json!({ "id": parent_id }));
        }

        let mut organization = Map::new();
        if let Some(org_id) = &self.config.org_id {
            organization.insert("id".to_string(), json!(org_id));
        }
        if let Some(org_key) = &self.config.org_key {
            organization.insert("key".to_string(), json!(org_key));
        }
        organization.insert("hubDomain".to_string(), json!(self.config.hub_domain));
        computed.insert("organization".to_string(), Value::Object(organization));

        deep_merge_json(request.settings.clone(), &Value::Object(computed))
    }
}

fn strip_linkage(item: &mut Item, data: &mut Value) {
    let values = data.get_mut("values").and_then(Value::as_object_mut);
    for field in LINKAGE_FIELDS {
        item.properties.remove(field);
    }
    if let Some(values) = values {
        for field in LINKAGE_FIELDS {
            values.remove(field);
        }
    }
}

/// Replace `{{appid}}` in a document with the identifier it was stored under.
///
/// # Errors
///
/// Returns an error if the substitution produces invalid JSON.
pub fn finalize_identifier(document: &Document, id: &str) -> Result<Document> {
    let mut finalized: Document = restore_identifier(document, id)?;
    finalized.item.id = Some(id.to_string());
    Ok(finalized)
}

/// Materialize `template`, store it, and share it with its teams.
///
/// # Errors
///
/// Returns [`SiteError::CollaboratorFailure`] naming the step that failed. Records
/// and teams created before the failure are left in place.
pub async fn create_from_template<S, P, E, H, I>(
    store: &S,
    materializer: &Materializer<'_, P, E, H, I>,
    template: &Template,
    request: &MaterializeRequest,
    transforms: &TransformRegistry,
) -> Result<MaterializedDocument>
where
    S: DocumentStore,
    P: Provisioner,
    E: ExistenceProbe,
    H: HostFormatter,
    I: Interpolator,
{
    const CREATE_FLOW: &str = "create from template";

    let mut materialized = materializer.materialize(template, request, transforms).await?;

    let id = store
        .create(&materialized.document)
        .await
        .map_err(|err| SiteError::collaborator(CREATE_FLOW, "create record", err))?;
    let finalized = finalize_identifier(&materialized.document, &id)?;
    store
        .update(&finalized)
        .await
        .map_err(|err| SiteError::collaborator(CREATE_FLOW, "update record", err))?;

    let provisioner = materializer.provisioner();
    join_strict(
        materialized.teams.records.iter().map(|team| provisioner.share_record(&id, &team.id)),
    )
    .await
    .map_err(|err| SiteError::collaborator(CREATE_FLOW, "share record", err))?;

    tracing::info!("Created {} {id} at {}", finalized.kind(), materialized.hostname);
    materialized.document = finalized;
    Ok(materialized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{StandardHostFormatter, TeamRecord};
    use std::sync::Mutex;

    struct FreeProbe;

    impl ExistenceProbe for FreeProbe {
        async fn exists(&self, candidate: &str) -> Result<bool> {
            Ok(candidate == "trails")
        }
    }

    #[derive(Default)]
    struct Recorder {
        tags: Mutex<Vec<(String, String)>>,
        fail_teams: bool,
    }

    impl Provisioner for Recorder {
        async fn create_teams(&self, request: &TeamRequest) -> Result<TeamsCreated> {
            if self.fail_teams {
                anyhow::bail!("403 forbidden");
            }
            let mut created = TeamsCreated::default();
            for kind in &request.kinds {
                let id = format!("{}-group", kind.property());
                created.identifiers.insert(kind.property().to_string(), id.clone());
                created.records.push(TeamRecord {
                    id,
                    kind: *kind,
                    tags: vec![],
                });
            }
            Ok(created)
        }

        async fn create_sub_record(&self, request: &SubRecordRequest) -> Result<Document> {
            let item = Item {
                id: Some("parent42".to_string()),
                title: request.title.clone(),
                item_type: request.item_type.clone(),
                ..Item::default()
            };
            Ok(Document::new(item, json!({})))
        }

        async fn share_record(&self, _id: &str, _group_id: &str) -> Result<()> {
            Ok(())
        }

        async fn unshare_record(&self, _id: &str, _group_ids: &[String]) -> Result<()> {
            Ok(())
        }

        async fn tag_team(&self, group_id: &str, tag: &str) -> Result<()> {
            if group_id.starts_with("followers") {
                anyhow::bail!("tagging failed");
            }
            self.tags.lock().unwrap().push((group_id.to_string(), tag.to_string()));
            Ok(())
        }
    }

    fn template() -> Template {
        serde_json::from_value(json!({
            "type": "Hub Site Application",
            "key": "parks_abcdefgh",
            "itemId": "old",
            "item": {
                "title": "{{solution.title}}",
                "type": "Hub Site Application",
                "typeKeywords": ["hubSite"],
                "properties": {"schemaVersion": 1.4, "contentGroupId": "stale"}
            },
            "data": {
                "values": {
                    "title": "{{solution.title}}",
                    "contentGroupId": "stale",
                    "theme": "{{theme.name:optional}}",
                    "map": "/items/{{appid}}/map",
                    "layout": {"sections": [{"rows": [{"cards": [
                        {"component": {"name": "items/gallery-card", "settings": {"groups": [{"title": "{{solution.title}}", "id": "{{teams.contentGroupId:optional}}"}]}}},
                        {"component": {"name": "follow-initiative-card", "settings": {"initiativeId": "{{parent.id:optional}}"}}}
                    ]}]}]}
                },
                "feeds": {"dcatUS11": {"title": "{{name}}"}}
            }
        }))
        .unwrap()
    }

    fn config() -> SiteConfig {
        SiteConfig {
            org_key: Some("cityofx".to_string()),
            org_id: Some("org1".to_string()),
            ..SiteConfig::default()
        }
    }

    #[tokio::test]
    async fn test_materialize_without_teams() {
        let config = config();
        let formatter = StandardHostFormatter::from_config(&config);
        let provisioner = Recorder::default();
        let materializer = Materializer::new(&config, &provisioner, &FreeProbe, &formatter);

        let result = materializer
            .materialize(&template(), &MaterializeRequest::titled("Trails"), &TransformRegistry::default())
            .await
            .unwrap();
        let doc = &result.document;

        assert_eq!(result.subdomain, "trails-1");
        assert_eq!(result.hostname, "trails-1-cityofx.hub.arcgis.com");
        assert_eq!(doc.item.title, "Trails");
        assert_eq!(doc.item.url.as_deref(), Some("https://trails-1-cityofx.hub.arcgis.com"));
        assert!(doc.item.type_keywords.contains(&"hubsubdomain|trails-1".to_string()));
        assert_eq!(doc.schema_version(), Some(SCHEMA_HEAD_VERSION));
        assert!(doc.item.properties.get("contentGroupId").is_none());

        let values = &doc.data["values"];
        assert_eq!(values["title"], "Trails");
        assert!(values.get("theme").is_none());
        assert!(values.get("contentGroupId").is_none());
        assert_eq!(values["map"], "/items/{{appid}}/map");
        assert_eq!(values["subdomain"], "trails-1");

        let cards = &values["layout"]["sections"][0]["rows"][0]["cards"];
        assert_eq!(cards[0]["component"]["settings"]["groups"], json!([{"title": "Trails"}]));
        assert!(cards[1]["component"]["settings"].get("initiativeId").is_none());

        assert_eq!(doc.data["feeds"]["dcatUS11"]["title"], "{{name}}");
    }

    #[tokio::test]
    async fn test_materialize_with_teams_and_parent() {
        let config = config();
        let formatter = StandardHostFormatter::from_config(&config);
        let provisioner = Recorder::default();
        let materializer = Materializer::new(&config, &provisioner, &FreeProbe, &formatter);
        let request = MaterializeRequest {
            teams: TeamKind::ALL.to_vec(),
            parent: Some(ParentRequest {
                item_type: "Hub Initiative".to_string(),
                tags: vec![],
            }),
            ..MaterializeRequest::titled("Parks")
        };

        let result =
            materializer.materialize(&template(), &request, &TransformRegistry::default()).await.unwrap();
        let doc = &result.document;

        assert_eq!(result.parent_id.as_deref(), Some("parent42"));
        assert_eq!(doc.item.properties["parentId"], "parent42");
        assert_eq!(doc.data["values"]["parentId"], "parent42");
        assert_eq!(doc.item.properties["contentGroupId"], "contentGroupId-group");

        let cards = &doc.data["values"]["layout"]["sections"][0]["rows"][0]["cards"];
        assert_eq!(cards[0]["component"]["settings"]["groups"][0]["id"], "contentGroupId-group");
        assert_eq!(cards[1]["component"]["settings"]["initiativeId"], "parent42");

        // followers tagging fails but the flow continues
        let tags = provisioner.tags.lock().unwrap();
        assert_eq!(tags.len(), 2);
        assert!(tags.iter().all(|(_, tag)| tag == "parent|parent42"));
    }

    #[tokio::test]
    async fn test_team_failure_is_wrapped() {
        let config = config();
        let formatter = StandardHostFormatter::from_config(&config);
        let provisioner = Recorder {
            fail_teams: true,
            ..Recorder::default()
        };
        let materializer = Materializer::new(&config, &provisioner, &FreeProbe, &formatter);
        let request = MaterializeRequest {
            teams: vec![TeamKind::Core],
            ..MaterializeRequest::titled("Parks")
        };

        let err = materializer
            .materialize(&template(), &request, &TransformRegistry::default())
            .await
            .unwrap_err();
        match err.downcast_ref::<SiteError>() {
            Some(SiteError::CollaboratorFailure { flow, step, .. }) => {
                assert_eq!(flow, "materialize");
                assert_eq!(step, "create teams");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_finalize_identifier() {
        let document = Document::from_value(json!({
            "item": {"title": "T", "type": "Hub Page"},
            "data": {"values": {"self": "{{appid}}"}}
        }))
        .unwrap();
        let finalized = finalize_identifier(&document, "new1").unwrap();
        assert_eq!(finalized.id(), Some("new1"));
        assert_eq!(finalized.data["values"]["self"], "new1");
    }
}
