//! Interfaces to the systems sitedoc consumes but does not implement.
//!
//! Every external side effect goes through one of these traits: the document and
//! resource stores, identity provisioning (teams, companion records, sharing), the
//! subdomain existence lookups and hostname composition. Implementations live
//! outside the core; [`LocalStore`] is a filesystem-backed implementation of the
//! storage traits used by the command line front end and by tests.
//!
//! The async methods use native `async fn` in traits and are consumed through
//! generics, so no boxing is involved.

#![allow(async_fn_in_trait)]

pub mod fanout;
pub mod local;

pub use fanout::{Outcome, join_best_effort, join_strict};
pub use local::{LocalStore, OfflineProvisioner};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{Environment, SiteConfig};
use crate::core::Document;

/// Persistent storage of documents.
pub trait DocumentStore {
    /// Fetch a document by id.
    ///
    /// Fails with [`crate::core::SiteError::DocumentNotFound`] when it does not exist.
    async fn fetch(&self, id: &str) -> Result<Document>;

    /// Create a new document and return its assigned id.
    async fn create(&self, document: &Document) -> Result<String>;

    /// Overwrite an existing document. Returns whether the store accepted the write.
    async fn update(&self, document: &Document) -> Result<bool>;

    /// Delete a document and its resources. Returns whether anything was removed.
    async fn remove(&self, id: &str) -> Result<bool>;
}

/// A binary resource attached to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// File name of the resource
    pub name: String,
    /// Size in bytes, when the store reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl ResourceDescriptor {
    /// Descriptor for a resource of unknown size.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
        }
    }
}

/// Storage of binary resources attached to documents.
pub trait ResourceStore {
    /// List the resources attached to a document, ordered by name.
    async fn list_resources(&self, id: &str) -> Result<Vec<ResourceDescriptor>>;

    /// Attach (or replace) a resource.
    async fn add_resource(&self, id: &str, name: &str, bytes: Vec<u8>) -> Result<()>;

    /// Remove a resource.
    async fn remove_resource(&self, id: &str, name: &str) -> Result<()>;
}

/// Kinds of team groups that can be provisioned alongside a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TeamKind {
    /// Core team that edits the site
    Core,
    /// Content team whose shared items feed galleries
    Content,
    /// Followers group for public engagement
    Followers,
}

impl TeamKind {
    /// Property name under which the team's group id is recorded.
    #[must_use]
    pub const fn property(self) -> &'static str {
        match self {
            Self::Core => "collaborationGroupId",
            Self::Content => "contentGroupId",
            Self::Followers => "followersGroupId",
        }
    }

    /// All team kinds, in provisioning order.
    pub const ALL: [Self; 3] = [Self::Core, Self::Content, Self::Followers];
}

/// Request to provision team groups for a new site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRequest {
    /// Title the groups are named after
    pub title: String,
    /// Which teams to create
    pub kinds: Vec<TeamKind>,
}

/// A provisioned team group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecord {
    /// Group identifier
    pub id: String,
    /// Which team this group is
    pub kind: TeamKind,
    /// Group tags
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Result of team provisioning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamsCreated {
    /// Property name (e.g. `contentGroupId`) to group id
    pub identifiers: BTreeMap<String, String>,
    /// The created groups
    pub records: Vec<TeamRecord>,
}

/// Request for a companion record created next to a new site.
#[derive(Debug, Clone, PartialEq)]
pub struct SubRecordRequest {
    /// Title of the companion record
    pub title: String,
    /// Item type of the companion record
    pub item_type: String,
    /// Tags of the companion record
    pub tags: Vec<String>,
}

/// Identity and provisioning operations.
pub trait Provisioner {
    /// Create the requested team groups.
    async fn create_teams(&self, request: &TeamRequest) -> Result<TeamsCreated>;

    /// Create a companion record and return it with its id assigned.
    async fn create_sub_record(&self, request: &SubRecordRequest) -> Result<Document>;

    /// Share a record with a group.
    async fn share_record(&self, id: &str, group_id: &str) -> Result<()>;

    /// Stop sharing a record with the given groups.
    async fn unshare_record(&self, id: &str, group_ids: &[String]) -> Result<()>;

    /// Add a tag to a team group.
    async fn tag_team(&self, group_id: &str, tag: &str) -> Result<()>;
}

/// Answers whether a candidate subdomain is already taken.
pub trait ExistenceProbe {
    /// Whether `candidate` is in use.
    async fn exists(&self, candidate: &str) -> Result<bool>;
}

/// Hosted domain registry lookup.
pub trait DomainRegistry {
    /// The site id registered for `hostname`, if any.
    async fn lookup_hostname(&self, hostname: &str) -> Result<Option<String>>;
}

/// Search over stored records.
pub trait RecordSearch {
    /// Ids of records carrying `keyword` among their type keywords.
    async fn search_by_type_keyword(&self, keyword: &str) -> Result<Vec<String>>;
}

/// Composes externally visible hostnames and URLs for new sites.
pub trait HostFormatter {
    /// Hostname for a subdomain.
    fn hostname(&self, subdomain: &str) -> String;

    /// Public URL for a hostname.
    fn site_url(&self, hostname: &str) -> String {
        format!("https://{hostname}")
    }
}

/// Hostname rules for hosted and self-managed deployments.
///
/// - Hosted: `<subdomain>-<org_key>.<hub_domain>`, or `<subdomain>.<hub_domain>` when
///   no org key is configured
/// - Self-managed: `<portal_hostname>/apps/sites/#/<subdomain>`
#[derive(Debug, Clone)]
pub struct StandardHostFormatter {
    environment: Environment,
    org_key: Option<String>,
    hub_domain: String,
    portal_hostname: Option<String>,
}

impl StandardHostFormatter {
    /// Build a formatter from configuration.
    #[must_use]
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            environment: config.environment,
            org_key: config.org_key.clone(),
            hub_domain: config.hub_domain.clone(),
            portal_hostname: config.portal_hostname.clone(),
        }
    }
}

impl HostFormatter for StandardHostFormatter {
    fn hostname(&self, subdomain: &str) -> String {
        match self.environment {
            Environment::Hosted => match &self.org_key {
                Some(key) => format!("{subdomain}-{key}.{}", self.hub_domain),
                None => format!("{subdomain}.{}", self.hub_domain),
            },
            Environment::SelfManaged => {
                let portal = self.portal_hostname.as_deref().unwrap_or("localhost");
                format!("{portal}/apps/sites/#/{subdomain}")
            }
        }
    }
}
