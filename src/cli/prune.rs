//! Remove crop images that a document's layout no longer references.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::CommandContext;
use crate::collaborators::{DocumentStore, ResourceStore};
use crate::core::SiteError;
use crate::layout::{Layout, collect_crop_ids, prune_stale_assets, stale_crop_resources};

/// Remove crop resources the document's layout no longer references.
///
/// Every re-crop of an image uploads a new `hub-image-crop-*` resource; old ones
/// accumulate until pruned. A document without a layout references no crops, so all
/// of its crop resources are removed.
#[derive(Args, Debug)]
pub struct PruneCommand {
    /// Identifier of the stored document
    id: String,

    /// List the resources that would be removed without removing them
    #[arg(long)]
    dry_run: bool,
}

impl PruneCommand {
    /// Execute the prune command.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or any removal fails.
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let document = context.store.fetch(&self.id).await?;
        let layout = Layout::from_data(&document.data)
            .map_err(|err| SiteError::InvalidDocument {
                reason: format!("layout is malformed: {err}"),
            })?
            .unwrap_or_default();

        if self.dry_run {
            let resources = context.store.list_resources(&self.id).await?;
            let stale = stale_crop_resources(&collect_crop_ids(&layout), &resources);
            if stale.is_empty() {
                println!("✅ No stale crop resources on {}", self.id.cyan());
            } else {
                println!("{} {} stale crop resource(s):", "Would remove".yellow(), stale.len());
                for name in &stale {
                    println!("  • {name}");
                }
            }
            return Ok(());
        }

        let report = prune_stale_assets(&context.store, &self.id, &layout).await?;
        for name in &report.removed {
            println!("  {} {name}", "removed".red());
        }
        for (name, err) in &report.failed {
            println!("  {} {name}: {err:#}", "failed".yellow());
        }
        if report.is_clean() {
            println!("✅ Removed {} stale crop resource(s) from {}", report.removed.len(), self.id.cyan());
            Ok(())
        } else {
            anyhow::bail!("{} stale crop resource(s) could not be removed", report.failed.len())
        }
    }
}
