//! Bring a stored document up to the current schema version.
//!
//! The `upgrade` command runs the standard migration chain over one record and
//! reports which steps are pending. Nothing is written unless `--write` is given.
//!
//! # Command Usage
//!
//! ```bash
//! # Show the pending migration steps
//! sitedoc upgrade 9a1f2e3d4c5b6a7980f1e2d3c4b5a697
//!
//! # Apply them and save the document
//! sitedoc upgrade 9a1f2e3d4c5b6a7980f1e2d3c4b5a697 --write
//! ```
//!
//! Documents already at (or past) the head version are reported and left alone.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::borrow::Cow;
use tracing::debug;

use super::CommandContext;
use crate::collaborators::DocumentStore;
use crate::migration::MigrationChain;

/// Command-line arguments for the upgrade command.
///
/// Runs every pending migration step over the stored document and reports the
/// version change. Without `--write` nothing is saved.
///
/// ```bash
/// # Show what would change
/// sitedoc upgrade 9a1f2e3d4c5b6a7980f1e2d3c4b5a697
///
/// # Save the upgraded document
/// sitedoc upgrade 9a1f2e3d4c5b6a7980f1e2d3c4b5a697 --write
/// ```
#[derive(Args, Debug)]
pub struct UpgradeCommand {
    /// Identifier of the stored document
    id: String,

    /// Save the upgraded document back to the store
    #[arg(long)]
    write: bool,
}

impl UpgradeCommand {
    /// Execute the upgrade command.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be fetched or, with `--write`, saved.
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let document = context.store.fetch(&self.id).await?;
        let chain = MigrationChain::standard();
        let from = document.schema_version();

        let upgraded = match chain.upgrade(&document) {
            Cow::Borrowed(_) => {
                println!(
                    "✅ {} is already at schema version {}",
                    self.id.cyan(),
                    chain.head_version()
                );
                return Ok(());
            }
            Cow::Owned(upgraded) => upgraded,
        };

        let pending: Vec<&str> =
            chain.steps().iter().filter(|step| step.is_pending(&document)).map(|step| step.name()).collect();
        debug!("Applied migration steps: {}", pending.join(", "));

        let from = from.map_or_else(|| "unversioned".to_string(), |v| v.to_string());
        let to = upgraded.schema_version().map_or_else(|| "unversioned".to_string(), |v| v.to_string());
        println!("{} {} → {}", "Upgrading".bold(), from.yellow(), to.green());
        for name in &pending {
            println!("  • {name}");
        }

        if self.write {
            context.store.update(&upgraded).await?;
            println!("✅ Saved {}", self.id.cyan());
        } else {
            println!("\n{}", "Dry run: pass --write to save the upgraded document".yellow());
        }
        Ok(())
    }
}
