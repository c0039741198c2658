//! Filesystem-backed collaborators.
//!
//! [`LocalStore`] keeps one directory per record under its root:
//!
//! ```text
//! <root>/
//! ├── domains.json            # hostname -> site id
//! └── <id>/
//!     ├── item.json
//!     ├── data.json
//!     └── resources/
//!         └── hub-image-crop-abc.png
//! ```
//!
//! Document writes go through [`crate::utils::fs::write_json`], so a crashed write
//! never leaves a truncated `item.json` behind.

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::{
    DocumentStore, DomainRegistry, Provisioner, RecordSearch, ResourceDescriptor, ResourceStore,
    SubRecordRequest, TeamRequest, TeamsCreated,
};
use crate::core::{Document, Item, SiteError};
use crate::utils::fs::{atomic_write_async, read_json, write_json};

const ITEM_FILE: &str = "item.json";
const DATA_FILE: &str = "data.json";
const RESOURCES_DIR: &str = "resources";
const DOMAINS_FILE: &str = "domains.json";

/// Item fields holding creation and modification times, in epoch milliseconds.
const CREATED_FIELD: &str = "created";
const MODIFIED_FIELD: &str = "modified";

/// Document, resource and domain storage in a local directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Create a store rooted at `root`. The directory is created lazily on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// The store's root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Record `hostname` as belonging to site `id` in the domain registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry file cannot be read or written.
    pub async fn register_hostname(&self, hostname: &str, id: &str) -> Result<()> {
        let mut domains = self.load_domains().await?;
        domains.insert(hostname.to_lowercase(), id.to_string());
        write_json(&self.root.join(DOMAINS_FILE), &domains).await
    }

    fn record_dir(&self, id: &str) -> Result<PathBuf> {
        validate_segment(id)?;
        Ok(self.root.join(id))
    }

    async fn existing_record_dir(&self, id: &str) -> Result<PathBuf> {
        let dir = self.record_dir(id)?;
        if fs::try_exists(dir.join(ITEM_FILE)).await.unwrap_or(false) {
            Ok(dir)
        } else {
            Err(SiteError::DocumentNotFound {
                id: id.to_string(),
            }
            .into())
        }
    }

    async fn load_domains(&self) -> Result<BTreeMap<String, String>> {
        let path = self.root.join(DOMAINS_FILE);
        if fs::try_exists(&path).await.unwrap_or(false) {
            read_json(&path).await
        } else {
            Ok(BTreeMap::new())
        }
    }

    async fn write_document(&self, dir: &Path, document: &Document) -> Result<()> {
        write_json(&dir.join(ITEM_FILE), &document.item).await?;
        write_json(&dir.join(DATA_FILE), &document.data).await
    }
}

/// Reject identifiers and resource names that would escape their directory.
fn validate_segment(value: &str) -> Result<()> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\'])
        || value.contains('\0');
    if invalid {
        return Err(SiteError::InvalidIdentifier {
            value: value.to_string(),
        }
        .into());
    }
    Ok(())
}

impl DocumentStore for LocalStore {
    async fn fetch(&self, id: &str) -> Result<Document> {
        let dir = self.existing_record_dir(id).await?;
        let mut item: Item = read_json(&dir.join(ITEM_FILE)).await?;
        let data_path = dir.join(DATA_FILE);
        let data: Value = if fs::try_exists(&data_path).await.unwrap_or(false) {
            read_json(&data_path).await?
        } else {
            Value::Object(serde_json::Map::new())
        };
        item.id = Some(id.to_string());
        tracing::debug!("Fetched document {id} from {}", dir.display());
        Ok(Document::new(item, data))
    }

    async fn create(&self, document: &Document) -> Result<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let dir = self.record_dir(&id)?;
        let mut stored = document.clone();
        stored.item.id = Some(id.clone());
        let now = Value::from(Utc::now().timestamp_millis());
        stored.item.extra.insert(CREATED_FIELD.to_string(), now.clone());
        stored.item.extra.insert(MODIFIED_FIELD.to_string(), now);
        self.write_document(&dir, &stored).await?;
        tracing::info!("Created document {id}");
        Ok(id)
    }

    async fn update(&self, document: &Document) -> Result<bool> {
        let id = document.id().ok_or_else(|| SiteError::InvalidDocument {
            reason: "cannot update a document without item.id".to_string(),
        })?;
        let dir = self.existing_record_dir(id).await?;
        let mut stored = document.clone();
        stored
            .item
            .extra
            .insert(MODIFIED_FIELD.to_string(), Value::from(Utc::now().timestamp_millis()));
        self.write_document(&dir, &stored).await?;
        tracing::debug!("Updated document {id}");
        Ok(true)
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let dir = self.record_dir(id)?;
        if !fs::try_exists(&dir).await.unwrap_or(false) {
            return Ok(false);
        }
        fs::remove_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to remove {}", dir.display()))?;
        tracing::info!("Removed document {id}");
        Ok(true)
    }
}

impl ResourceStore for LocalStore {
    async fn list_resources(&self, id: &str) -> Result<Vec<ResourceDescriptor>> {
        let dir = self.existing_record_dir(id).await?.join(RESOURCES_DIR);
        if !fs::try_exists(&dir).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut resources = Vec::new();
        let mut entries = fs::read_dir(&dir)
            .await
            .with_context(|| format!("Failed to list resources in {}", dir.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            resources.push(ResourceDescriptor {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: Some(metadata.len()),
            });
        }
        resources.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(resources)
    }

    async fn add_resource(&self, id: &str, name: &str, bytes: Vec<u8>) -> Result<()> {
        validate_segment(name)?;
        let path = self.existing_record_dir(id).await?.join(RESOURCES_DIR).join(name);
        atomic_write_async(path, bytes).await?;
        tracing::debug!("Added resource {name} to {id}");
        Ok(())
    }

    async fn remove_resource(&self, id: &str, name: &str) -> Result<()> {
        validate_segment(name)?;
        let path = self.existing_record_dir(id).await?.join(RESOURCES_DIR).join(name);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(SiteError::ResourceNotFound {
                id: id.to_string(),
                name: name.to_string(),
            }
            .into());
        }
        fs::remove_file(&path)
            .await
            .with_context(|| format!("Failed to remove {}", path.display()))?;
        tracing::debug!("Removed resource {name} from {id}");
        Ok(())
    }
}

impl RecordSearch for LocalStore {
    async fn search_by_type_keyword(&self, keyword: &str) -> Result<Vec<String>> {
        if !fs::try_exists(&self.root).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut matches = Vec::new();
        let mut entries = fs::read_dir(&self.root)
            .await
            .with_context(|| format!("Failed to read store at {}", self.root.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let item_path = entry.path().join(ITEM_FILE);
            if !fs::try_exists(&item_path).await.unwrap_or(false) {
                continue;
            }
            let item: Item = match read_json(&item_path).await {
                Ok(item) => item,
                Err(err) => {
                    tracing::warn!("Skipping unreadable record {}: {err:#}", item_path.display());
                    continue;
                }
            };
            if item.type_keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword)) {
                matches.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        matches.sort();
        Ok(matches)
    }
}

impl DomainRegistry for LocalStore {
    async fn lookup_hostname(&self, hostname: &str) -> Result<Option<String>> {
        let domains = self.load_domains().await?;
        Ok(domains.get(&hostname.to_lowercase()).cloned())
    }
}

/// Provisioner for environments without an identity service.
///
/// Every call fails, so flows that need teams or companion records report a
/// collaborator failure instead of silently skipping the step.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineProvisioner;

fn offline(operation: &str) -> anyhow::Error {
    anyhow::anyhow!("{operation} requires a provisioning service, none is configured")
}

impl Provisioner for OfflineProvisioner {
    async fn create_teams(&self, _request: &TeamRequest) -> Result<TeamsCreated> {
        Err(offline("create teams"))
    }

    async fn create_sub_record(&self, _request: &SubRecordRequest) -> Result<Document> {
        Err(offline("create sub record"))
    }

    async fn share_record(&self, _id: &str, _group_id: &str) -> Result<()> {
        Err(offline("share record"))
    }

    async fn unshare_record(&self, _id: &str, _group_ids: &[String]) -> Result<()> {
        Err(offline("unshare record"))
    }

    async fn tag_team(&self, _group_id: &str, _tag: &str) -> Result<()> {
        Err(offline("tag team"))
    }
}
