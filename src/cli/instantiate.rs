//! Create a new site or page from a template file.
//!
//! The template is materialized against the configured environment: a unique
//! subdomain is allocated (through the domain registry when hosted, through type
//! keywords when self-managed), placeholders are interpolated and the result is
//! stored as a new record.
//!
//! ```bash
//! sitedoc instantiate parks.template.json --title "Trails"
//! sitedoc instantiate parks.template.json --title "Trails" --settings settings.json
//! ```
//!
//! The local store has no provisioning backend, so no teams or parent records are
//! created and template assets are not copied.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::{Value, json};
use std::path::PathBuf;

use super::CommandContext;
use crate::collaborators::{ExistenceProbe, OfflineProvisioner, StandardHostFormatter};
use crate::config::Environment;
use crate::naming::{HostedDomainProbe, KeywordSearchProbe};
use crate::templating::{
    MaterializeRequest, MaterializedDocument, Materializer, Template, TransformRegistry,
    create_from_template,
};
use crate::utils::fs::read_json;

/// Create a new site or page from a template file.
///
/// The subdomain is derived from `--title` and made unique against the store. In a
/// hosted deployment the resulting hostname is registered in the store's domain
/// registry. Team groups and parent records need a provisioning service and are not
/// created from the command line.
///
/// ```bash
/// sitedoc instantiate parks.template.json --title "Trails" --settings trails.json
/// ```
#[derive(Args, Debug)]
pub struct InstantiateCommand {
    /// Template file written by `sitedoc convert`
    template_file: PathBuf,

    /// Title of the new document
    #[arg(long)]
    title: String,

    /// JSON file with settings made available to placeholders
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl InstantiateCommand {
    /// Execute the instantiate command.
    ///
    /// # Errors
    ///
    /// Returns an error if the template or settings file cannot be read, if the
    /// configuration does not allow allocating a subdomain, or if any store call
    /// fails.
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let template: Template = read_json(&self.template_file)
            .await
            .with_context(|| format!("Failed to load template {}", self.template_file.display()))?;
        let settings: Value = match &self.settings {
            Some(path) => read_json(path).await?,
            None => json!({}),
        };
        let request = MaterializeRequest {
            settings,
            ..MaterializeRequest::titled(self.title)
        };

        let formatter = StandardHostFormatter::from_config(&context.config);
        let created = match context.config.environment {
            Environment::Hosted => {
                let probe = HostedDomainProbe::new(&context.config, &context.store, &formatter)?;
                let created = instantiate_with(context, &probe, &formatter, &template, &request).await?;
                context.store.register_hostname(&created.hostname, &created_id(&created)?).await?;
                created
            }
            Environment::SelfManaged => {
                let probe = KeywordSearchProbe::new(&context.store);
                instantiate_with(context, &probe, &formatter, &template, &request).await?
            }
        };

        println!("✅ Created {} {}", created.document.kind(), created_id(&created)?.cyan());
        println!("  Subdomain: {}", created.subdomain.green());
        println!("  Hostname:  {}", created.hostname);
        if let Some(url) = &created.document.item.url {
            println!("  URL:       {url}");
        }
        if !template.assets.is_empty() {
            println!(
                "\n{} {} asset(s) listed by the template must be uploaded separately",
                "Note:".yellow(),
                template.assets.len()
            );
        }
        Ok(())
    }
}

async fn instantiate_with<E: ExistenceProbe>(
    context: &CommandContext,
    probe: &E,
    formatter: &StandardHostFormatter,
    template: &Template,
    request: &MaterializeRequest,
) -> Result<MaterializedDocument> {
    let provisioner = OfflineProvisioner;
    let materializer = Materializer::new(&context.config, &provisioner, probe, formatter);
    create_from_template(&context.store, &materializer, template, request, &TransformRegistry::default())
        .await
}

fn created_id(created: &MaterializedDocument) -> Result<String> {
    created
        .document
        .id()
        .map(str::to_string)
        .context("store returned a document without an id")
}
