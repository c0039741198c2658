//! Command-line interface for sitedoc.
//!
//! Each subcommand lives in its own module with its own argument structure and an
//! `execute` method taking the shared [`CommandContext`].
//!
//! # Available Commands
//!
//! ## Documents
//! - `upgrade` - Run the schema migration chain over a stored document
//! - `inspect` - Show a document's schema version, layout references and resources
//! - `prune` - Remove crop resources no longer referenced by the layout
//!
//! ## Templates
//! - `convert` - Turn a stored site or page into a tenant-agnostic template
//! - `instantiate` - Create a new site or page from a template file
//! - `allocate` - Find a free subdomain for a base name
//!
//! # Typical Workflow
//!
//! ```bash
//! # Bring an old site up to the current schema and save it
//! sitedoc upgrade 9a1f2e3d4c5b6a7980f1e2d3c4b5a697 --write
//!
//! # Make a template out of it
//! sitedoc convert 9a1f2e3d4c5b6a7980f1e2d3c4b5a697 --out parks.template.json
//!
//! # Stand up a copy under a new title
//! sitedoc instantiate parks.template.json --title "Trails"
//! ```
//!
//! # Store Location
//!
//! Documents are read from a [`LocalStore`] directory chosen, in order, from
//! `--store`, `$SITEDOC_STORE`, `store_dir` in the configuration file, and finally
//! `~/.sitedoc/store`.

mod allocate;
mod convert;
mod inspect;
mod instantiate;
mod prune;
mod upgrade;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::collaborators::LocalStore;
use crate::config::SiteConfig;

/// Main CLI structure for sitedoc.
///
/// Options marked `global = true` are accepted before or after the subcommand.
#[derive(Parser)]
#[command(
    name = "sitedoc",
    about = "Migrate, templatize and instantiate hosted site and page documents",
    version,
    long_about = None
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (debug logging).
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only report errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file (default: `~/.sitedoc/config.toml`).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory of the local document store.
    #[arg(long, global = true, env = "SITEDOC_STORE")]
    store: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upgrade a stored document to the current schema version.
    Upgrade(upgrade::UpgradeCommand),

    /// Show what a stored document contains.
    Inspect(inspect::InspectCommand),

    /// Convert a stored site or page into a template.
    Convert(convert::ConvertCommand),

    /// Create a new site or page from a template file.
    Instantiate(instantiate::InstantiateCommand),

    /// Remove crop resources the layout no longer references.
    Prune(prune::PruneCommand),

    /// Find a free subdomain for a base name.
    Allocate(allocate::AllocateCommand),
}

/// Everything a command needs: the loaded configuration and the document store.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Loaded configuration
    pub config: SiteConfig,
    /// Local document store
    pub store: LocalStore,
}

impl CommandContext {
    /// Load the configuration and open the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be parsed, or if
    /// no store directory is given and the home directory cannot be determined.
    pub async fn load(config_path: Option<PathBuf>, store_dir: Option<PathBuf>) -> Result<Self> {
        let config = SiteConfig::load_with_optional(config_path).await?;
        let root = match store_dir.or_else(|| config.store_dir.clone()) {
            Some(root) => root,
            None => default_store_dir()?,
        };
        tracing::debug!("Using store at {}", root.display());
        Ok(Self {
            config,
            store: LocalStore::new(root),
        })
    }
}

fn default_store_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?;
    Ok(home.join(".sitedoc").join("store"))
}

impl Cli {
    /// Log filter implied by the verbosity flags.
    ///
    /// `--verbose` gives `debug`, `--quiet` gives `error`, otherwise `info`.
    #[must_use]
    pub const fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }

    /// Whether a verbosity flag was given explicitly, overriding `RUST_LOG`.
    #[must_use]
    pub const fn verbosity_overridden(&self) -> bool {
        self.verbose || self.quiet
    }

    /// Execute the selected command.
    ///
    /// # Errors
    ///
    /// Returns whatever error the command reports.
    pub async fn execute(self) -> Result<()> {
        let context = CommandContext::load(self.config, self.store).await?;

        match self.command {
            Commands::Upgrade(cmd) => cmd.execute(&context).await,
            Commands::Inspect(cmd) => cmd.execute(&context).await,
            Commands::Convert(cmd) => cmd.execute(&context).await,
            Commands::Instantiate(cmd) => cmd.execute(&context).await,
            Commands::Prune(cmd) => cmd.execute(&context).await,
            Commands::Allocate(cmd) => cmd.execute(&context).await,
        }
    }
}
