//! Preview the subdomain a title would be given.
//!
//! Runs the same allocation as `instantiate` but creates nothing.
//!
//! ```bash
//! sitedoc allocate "Parks and Trails"
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::CommandContext;
use crate::collaborators::{HostFormatter, StandardHostFormatter};
use crate::config::Environment;
use crate::naming::{HostedDomainProbe, KeywordSearchProbe, NameLimits, allocate_with_probe};
use crate::utils::subdomain_seed;

/// Find a free subdomain for a base name without creating anything.
///
/// The base is slugified the same way titles are when instantiating a template.
#[derive(Args, Debug)]
pub struct AllocateCommand {
    /// Base name or title
    base: String,
}

impl AllocateCommand {
    /// Execute the allocate command.
    ///
    /// # Errors
    ///
    /// Returns an error if the existence checks fail or no free name is found.
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let seed = subdomain_seed(&self.base);
        let limits = NameLimits::from_config(&context.config);
        let formatter = StandardHostFormatter::from_config(&context.config);

        let subdomain = match context.config.environment {
            Environment::Hosted => {
                let probe = HostedDomainProbe::new(&context.config, &context.store, &formatter)?;
                allocate_with_probe(&seed, &probe, limits).await?
            }
            Environment::SelfManaged => {
                let probe = KeywordSearchProbe::new(&context.store);
                allocate_with_probe(&seed, &probe, limits).await?
            }
        };

        println!("{}", subdomain.green());
        tracing::info!("Hostname would be {}", formatter.hostname(&subdomain));
        Ok(())
    }
}
