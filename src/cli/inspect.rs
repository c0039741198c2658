//! Summarize a stored site or page.
//!
//! The `inspect` command reads one record and reports what a conversion or a prune
//! would look at: schema version, dependencies collected from the layout, asset
//! references, crop identifiers and crop resources the layout no longer uses.
//!
//! # Command Usage
//!
//! ```bash
//! sitedoc inspect <id>
//! sitedoc inspect <id> --format json
//! ```
//!
//! # Output Formats
//!
//! - `text` (default): colored, human readable summary
//! - `json`: a single camelCase object suitable for scripting

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde::Serialize;

use super::CommandContext;
use crate::collaborators::{DocumentStore, ResourceStore};
use crate::constants::SCHEMA_HEAD_VERSION;
use crate::core::{Document, SiteError};
use crate::layout::{Layout, collect_assets, collect_crop_ids, collect_dependencies, stale_crop_resources};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Show a stored document's schema version, layout references and resources.
#[derive(Args, Debug)]
pub struct InspectCommand {
    /// Identifier of the stored document
    id: String,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    id: String,
    title: String,
    item_type: String,
    kind: String,
    schema_version: Option<f64>,
    needs_upgrade: bool,
    subdomain: Option<String>,
    dependencies: Vec<String>,
    assets: Vec<String>,
    crop_ids: Vec<String>,
    resources: Vec<String>,
    stale_crops: Vec<String>,
}

impl InspectCommand {
    /// Execute the inspect command and print the report.
    ///
    /// # Errors
    ///
    /// Returns an error if the document or its resource listing cannot be read, or
    /// if the layout is malformed.
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let document = context.store.fetch(&self.id).await?;
        let resources = context.store.list_resources(&self.id).await?;
        let report = build_report(&self.id, &document, resources.iter().map(|r| r.name.clone()).collect())?;

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&report).context("Failed to serialize report")?);
            }
            OutputFormat::Text => print_text(&report),
        }
        Ok(())
    }
}

fn build_report(id: &str, document: &Document, resources: Vec<String>) -> Result<Report> {
    let layout = Layout::from_data(&document.data)
        .map_err(|err| SiteError::InvalidDocument {
            reason: format!("layout is malformed: {err}"),
        })?
        .unwrap_or_default();

    let crop_ids = collect_crop_ids(&layout);
    let descriptors: Vec<_> =
        resources.iter().map(crate::collaborators::ResourceDescriptor::named).collect();
    let stale_crops = stale_crop_resources(&crop_ids, &descriptors);
    let schema_version = document.schema_version();

    Ok(Report {
        id: id.to_string(),
        title: document.item.title.clone(),
        item_type: document.item.item_type.clone(),
        kind: document.kind().to_string(),
        schema_version,
        needs_upgrade: schema_version.is_none_or(|v| v < SCHEMA_HEAD_VERSION),
        subdomain: document.data_get("values.subdomain").and_then(|v| v.as_str()).map(str::to_string),
        dependencies: collect_dependencies(&layout),
        assets: collect_assets(&layout),
        crop_ids,
        resources,
        stale_crops,
    })
}

fn print_text(report: &Report) {
    println!("{} ({})", report.title.bold(), report.id.cyan());
    println!("  Type:           {} [{}]", report.item_type, report.kind);
    let version = report.schema_version.map_or_else(|| "unversioned".to_string(), |v| v.to_string());
    if report.needs_upgrade {
        println!("  Schema version: {} (upgrade available)", version.yellow());
    } else {
        println!("  Schema version: {}", version.green());
    }
    if let Some(subdomain) = &report.subdomain {
        println!("  Subdomain:      {subdomain}");
    }

    print_list("Dependencies", &report.dependencies);
    print_list("Layout assets", &report.assets);
    print_list("Resources", &report.resources);
    if !report.stale_crops.is_empty() {
        println!("\n{}", "Stale crops (remove with `sitedoc prune`):".yellow());
        for name in &report.stale_crops {
            println!("  • {name}");
        }
    }
}

fn print_list(label: &str, entries: &[String]) {
    println!("\n{} ({})", label.bold(), entries.len());
    for entry in entries {
        println!("  • {entry}");
    }
}
