//! Cleanup of crop resources no longer referenced by a layout.
//!
//! Every time an image is re-cropped a new `hub-image-crop-<cropId>...` resource is
//! uploaded and the layout switches to the new crop id. Old crops stay attached to
//! the record until pruned here.

use anyhow::Result;

use super::{Layout, collect_crop_ids};
use crate::collaborators::{Outcome, ResourceDescriptor, ResourceStore, join_best_effort};
use crate::constants::CROP_RESOURCE_PREFIX;

/// Result of a prune run.
#[derive(Debug, Default)]
pub struct PruneReport {
    /// Resources that were removed
    pub removed: Vec<String>,
    /// Resources that could not be removed, with the reason
    pub failed: Vec<(String, anyhow::Error)>,
}

impl PruneReport {
    /// Whether every nominated resource was removed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Names of crop resources that embed none of the current crop ids.
///
/// Resources without the crop prefix are never nominated. With no current crop ids,
/// every crop resource is stale.
#[must_use]
pub fn stale_crop_resources(current_crop_ids: &[String], resources: &[ResourceDescriptor]) -> Vec<String> {
    resources
        .iter()
        .map(|resource| resource.name.as_str())
        .filter(|name| name.starts_with(CROP_RESOURCE_PREFIX))
        .filter(|name| !current_crop_ids.iter().any(|id| name.contains(id.as_str())))
        .map(str::to_string)
        .collect()
}

/// Remove crop resources of record `id` that `layout` no longer references.
///
/// Removals run concurrently; a failed removal is reported, not propagated.
///
/// # Errors
///
/// Returns an error only if the resource listing fails.
pub async fn prune_stale_assets<S>(store: &S, id: &str, layout: &Layout) -> Result<PruneReport>
where
    S: ResourceStore,
{
    let current = collect_crop_ids(layout);
    let resources = store.list_resources(id).await?;
    let stale = stale_crop_resources(&current, &resources);
    tracing::debug!("{} of {} resource(s) on {id} are stale crops", stale.len(), resources.len());

    let outcomes = join_best_effort(stale.iter().map(|name| store.remove_resource(id, name))).await;

    let mut report = PruneReport::default();
    for (name, outcome) in stale.into_iter().zip(outcomes) {
        match outcome {
            Outcome::Succeeded(()) => report.removed.push(name),
            Outcome::Failed(err) => {
                tracing::warn!("Failed to remove stale resource {name} from {id}: {err:#}");
                report.failed.push((name, err));
            }
        }
    }

    tracing::info!("Pruned {} stale crop resource(s) from {id}", report.removed.len());
    Ok(report)
}
