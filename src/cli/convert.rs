//! Turn a live document into a reusable template.
//!
//! The document is upgraded to the head schema version in memory first, then
//! converted: volatile values are stripped, the layout is templatized and the
//! record's own identifier is replaced with `{{appid}}`. The stored record is not
//! modified.
//!
//! ```bash
//! # Print the template to stdout
//! sitedoc convert <id>
//!
//! # Write it to a file
//! sitedoc convert <id> --out parks.template.json
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::CommandContext;
use crate::collaborators::DocumentStore;
use crate::migration::upgrade;
use crate::templating::{ConversionContext, convert};
use crate::utils::fs::write_json;

/// Convert a stored site or page into a template.
///
/// The document is upgraded to the current schema first. The template is printed
/// to stdout unless `--out` names a file.
#[derive(Args, Debug)]
pub struct ConvertCommand {
    /// Identifier of the stored document
    id: String,

    /// Write the template to this file instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,
}

impl ConvertCommand {
    /// Execute the convert command.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be fetched or converted, or if the
    /// output file cannot be written.
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let document = context.store.fetch(&self.id).await?;
        let document = upgrade(&document);
        let conversion = ConversionContext {
            environment: context.config.environment,
        };
        let template = convert(&document, &conversion, &context.store).await?;

        match self.out {
            Some(path) => {
                write_json(&path, &template).await?;
                eprintln!(
                    "✅ Wrote template {} ({} dependencies, {} assets) to {}",
                    template.key.green(),
                    template.dependencies.len(),
                    template.assets.len(),
                    path.display()
                );
            }
            None => {
                let json = serde_json::to_string_pretty(&template).context("Failed to serialize template")?;
                println!("{json}");
            }
        }
        Ok(())
    }
}
