//! Configuration management for sitedoc
//!
//! sitedoc reads a single TOML file describing the deployment it operates against.
//! See [`SiteConfig`] for the file format and [`Environment`] for the deployment
//! modes that change naming and type rules.

pub mod site;

pub use site::{Environment, SiteConfig};
