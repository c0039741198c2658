//! In-memory collaborators for tests.

use anyhow::{Result, bail};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::collaborators::{
    DocumentStore, DomainRegistry, Provisioner, RecordSearch, ResourceDescriptor, ResourceStore,
    SubRecordRequest, TeamKind, TeamRecord, TeamRequest, TeamsCreated,
};
use crate::core::{Document, Item, SiteError};

#[derive(Debug, Default)]
struct StoreState {
    documents: BTreeMap<String, Document>,
    resources: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    domains: BTreeMap<String, String>,
    next_id: usize,
}

/// Document and resource store held entirely in memory.
///
/// Identifiers are assigned sequentially as `doc1`, `doc2`, ... so assertions can
/// name them.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a document under an explicit id, replacing any existing one.
    pub fn insert(&self, id: &str, mut document: Document) {
        document.item.id = Some(id.to_string());
        self.state().documents.insert(id.to_string(), document);
    }

    /// Attach a resource without going through the async API.
    pub fn insert_resource(&self, id: &str, name: &str, bytes: &[u8]) {
        self.state()
            .resources
            .entry(id.to_string())
            .or_default()
            .insert(name.to_string(), bytes.to_vec());
    }

    /// Register a hostname in the domain registry.
    pub fn register_hostname(&self, hostname: &str, id: &str) {
        self.state().domains.insert(hostname.to_lowercase(), id.to_string());
    }

    /// Whether a document with `id` exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.state().documents.contains_key(id)
    }

    /// A copy of the stored document, if any.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Document> {
        self.state().documents.get(id).cloned()
    }

    /// Names of the resources attached to `id`.
    #[must_use]
    pub fn resource_names(&self, id: &str) -> Vec<String> {
        self.state()
            .resources
            .get(id)
            .map(|resources| resources.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state().documents.len()
    }

    /// Whether the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentStore for MemoryStore {
    async fn fetch(&self, id: &str) -> Result<Document> {
        self.get(id).ok_or_else(|| {
            SiteError::DocumentNotFound {
                id: id.to_string(),
            }
            .into()
        })
    }

    async fn create(&self, document: &Document) -> Result<String> {
        let mut state = self.state();
        state.next_id += 1;
        let id = format!("doc{}", state.next_id);
        let mut stored = document.clone();
        stored.item.id = Some(id.clone());
        state.documents.insert(id.clone(), stored);
        Ok(id)
    }

    async fn update(&self, document: &Document) -> Result<bool> {
        let Some(id) = document.id() else {
            bail!(SiteError::InvalidDocument {
                reason: "cannot update a document without an id".to_string(),
            });
        };
        let mut state = self.state();
        match state.documents.get_mut(id) {
            Some(existing) => {
                *existing = document.clone();
                Ok(true)
            }
            None => bail!(SiteError::DocumentNotFound {
                id: id.to_string(),
            }),
        }
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let mut state = self.state();
        state.resources.remove(id);
        Ok(state.documents.remove(id).is_some())
    }
}

impl ResourceStore for MemoryStore {
    async fn list_resources(&self, id: &str) -> Result<Vec<ResourceDescriptor>> {
        let state = self.state();
        if !state.documents.contains_key(id) {
            bail!(SiteError::DocumentNotFound {
                id: id.to_string(),
            });
        }
        Ok(state
            .resources
            .get(id)
            .map(|resources| {
                resources
                    .iter()
                    .map(|(name, bytes)| ResourceDescriptor {
                        name: name.clone(),
                        size: Some(bytes.len() as u64),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn add_resource(&self, id: &str, name: &str, bytes: Vec<u8>) -> Result<()> {
        self.state().resources.entry(id.to_string()).or_default().insert(name.to_string(), bytes);
        Ok(())
    }

    async fn remove_resource(&self, id: &str, name: &str) -> Result<()> {
        let removed =
            self.state().resources.get_mut(id).and_then(|resources| resources.remove(name));
        match removed {
            Some(_) => Ok(()),
            None => bail!(SiteError::ResourceNotFound {
                id: id.to_string(),
                name: name.to_string(),
            }),
        }
    }
}

impl RecordSearch for MemoryStore {
    async fn search_by_type_keyword(&self, keyword: &str) -> Result<Vec<String>> {
        Ok(self
            .state()
            .documents
            .iter()
            .filter(|(_, doc)| doc.item.type_keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword)))
            .map(|(id, _)| id.clone())
            .collect())
    }
}

impl DomainRegistry for MemoryStore {
    async fn lookup_hostname(&self, hostname: &str) -> Result<Option<String>> {
        Ok(self.state().domains.get(&hostname.to_lowercase()).cloned())
    }
}

/// A provisioning call observed by [`RecordingProvisioner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionCall {
    /// `create_teams`
    CreateTeams {
        /// Requested title
        title: String,
        /// Requested kinds
        kinds: Vec<TeamKind>,
    },
    /// `create_sub_record`
    CreateSubRecord {
        /// Requested title
        title: String,
        /// Requested item type
        item_type: String,
    },
    /// `share_record`
    Share {
        /// Shared record
        id: String,
        /// Target group
        group_id: String,
    },
    /// `unshare_record`
    Unshare {
        /// Unshared record
        id: String,
        /// Groups removed
        group_ids: Vec<String>,
    },
    /// `tag_team`
    Tag {
        /// Tagged group
        group_id: String,
        /// Tag added
        tag: String,
    },
}

/// Provisioner that records calls and succeeds unless told otherwise.
///
/// Team groups get ids `<kind>-team` (`core-team`, `content-team`,
/// `followers-team`); the parent record gets `parent1`.
#[derive(Debug, Default)]
pub struct RecordingProvisioner {
    calls: Mutex<Vec<ProvisionCall>>,
    failing: BTreeSet<String>,
    failing_groups: BTreeSet<String>,
}

impl RecordingProvisioner {
    /// A provisioner where every call succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `operation` fail. Operation names are the trait method
    /// names, e.g. `create_teams` or `share_record`.
    #[must_use]
    pub fn failing(mut self, operation: &str) -> Self {
        self.failing.insert(operation.to_string());
        self
    }

    /// Make `share_record` and `tag_team` fail for one group only.
    #[must_use]
    pub fn failing_for_group(mut self, group_id: &str) -> Self {
        self.failing_groups.insert(group_id.to_string());
        self
    }

    /// Calls observed so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ProvisionCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, operation: &str, call: ProvisionCall) -> Result<()> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
        if self.failing.contains(operation) {
            bail!("{operation} rejected by test provisioner");
        }
        Ok(())
    }

    fn check_group(&self, group_id: &str) -> Result<()> {
        if self.failing_groups.contains(group_id) {
            bail!("group {group_id} rejected by test provisioner");
        }
        Ok(())
    }
}

fn team_id(kind: TeamKind) -> String {
    let prefix = match kind {
        TeamKind::Core => "core",
        TeamKind::Content => "content",
        TeamKind::Followers => "followers",
    };
    format!("{prefix}-team")
}

impl Provisioner for RecordingProvisioner {
    async fn create_teams(&self, request: &TeamRequest) -> Result<TeamsCreated> {
        self.record(
            "create_teams",
            ProvisionCall::CreateTeams {
                title: request.title.clone(),
                kinds: request.kinds.clone(),
            },
        )?;
        let mut created = TeamsCreated::default();
        for kind in &request.kinds {
            let id = team_id(*kind);
            created.identifiers.insert(kind.property().to_string(), id.clone());
            created.records.push(TeamRecord {
                id,
                kind: *kind,
                tags: Vec::new(),
            });
        }
        Ok(created)
    }

    async fn create_sub_record(&self, request: &SubRecordRequest) -> Result<Document> {
        self.record(
            "create_sub_record",
            ProvisionCall::CreateSubRecord {
                title: request.title.clone(),
                item_type: request.item_type.clone(),
            },
        )?;
        let item = Item {
            id: Some("parent1".to_string()),
            title: request.title.clone(),
            item_type: request.item_type.clone(),
            tags: request.tags.clone(),
            ..Item::default()
        };
        Ok(Document::new(item, json!({})))
    }

    async fn share_record(&self, id: &str, group_id: &str) -> Result<()> {
        self.record(
            "share_record",
            ProvisionCall::Share {
                id: id.to_string(),
                group_id: group_id.to_string(),
            },
        )?;
        self.check_group(group_id)
    }

    async fn unshare_record(&self, id: &str, group_ids: &[String]) -> Result<()> {
        self.record(
            "unshare_record",
            ProvisionCall::Unshare {
                id: id.to_string(),
                group_ids: group_ids.to_vec(),
            },
        )
    }

    async fn tag_team(&self, group_id: &str, tag: &str) -> Result<()> {
        self.record(
            "tag_team",
            ProvisionCall::Tag {
                group_id: group_id.to_string(),
                tag: tag.to_string(),
            },
        )?;
        self.check_group(group_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;

    #[tokio::test]
    async fn test_memory_store_lifecycle() {
        let store = MemoryStore::new();
        let id = store.create(&fixtures::legacy_site()).await.unwrap();
        assert_eq!(id, "doc1");
        assert_eq!(store.fetch(&id).await.unwrap().id(), Some("doc1"));

        store.add_resource(&id, "a.png", vec![1, 2]).await.unwrap();
        let listed = store.list_resources(&id).await.unwrap();
        assert_eq!(listed[0].size, Some(2));

        assert!(store.remove(&id).await.unwrap());
        assert!(store.is_empty());
        assert!(store.fetch(&id).await.is_err());
    }

    #[tokio::test]
    async fn test_recording_provisioner_failures() {
        let provisioner = RecordingProvisioner::new().failing("create_teams");
        let request = TeamRequest {
            title: "Parks".to_string(),
            kinds: vec![TeamKind::Core],
        };
        assert!(provisioner.create_teams(&request).await.is_err());
        assert_eq!(provisioner.calls().len(), 1);
    }
}
