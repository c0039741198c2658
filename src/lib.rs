//! sitedoc - site and page document tooling
//!
//! Hosted sites and their pages are stored as JSON documents: item metadata plus a
//! free-form payload whose `values.layout` describes sections, rows and cards. This
//! crate keeps those documents healthy over time and moves them between
//! organizations.
//!
//! # Architecture Overview
//!
//! - Documents saved by older clients are brought to the current schema by an
//!   ordered chain of idempotent migration steps
//! - A live document is turned into a tenant-agnostic template: volatile values
//!   are stripped, its own identifier becomes `{{appid}}`, and layout cards are
//!   rewritten with placeholder tokens
//! - A template is instantiated by provisioning teams, allocating a unique
//!   subdomain, interpolating tokens against a settings context, and storing the
//!   result
//!
//! Every side-effecting operation goes through a trait in [`collaborators`]; the
//! crate ships a filesystem-backed [`collaborators::LocalStore`] and the CLI uses it.
//!
//! # Core Modules
//!
//! - [`core`] - Document model and error taxonomy
//! - [`utils`] - Dotted-path access into JSON, slugs, atomic file writes
//! - [`naming`] - Unique subdomain allocation
//! - [`layout`] - Typed layout tree, dependency and asset collection, crop pruning
//! - [`templating`] - Conversion, interpolation and materialization
//! - [`migration`] - Schema migration chain
//! - [`collaborators`] - Store, provisioner and probe traits plus local implementations
//! - [`config`] - `~/.sitedoc/config.toml`
//! - [`cli`] - The `sitedoc` command line
//!
//! # Example
//!
//! ```rust
//! use sitedoc::core::Document;
//! use sitedoc::migration::upgrade;
//! use serde_json::json;
//!
//! let legacy = Document::from_value(json!({
//!     "item": {"title": "Parks", "type": "Hub Site Application"},
//!     "data": {"values": {"subdomain": "Parks", "groups": "0f1e2d3c4b5a69788796a5b4c3d2e1f0"}}
//! }))
//! .unwrap();
//!
//! let current = upgrade(&legacy);
//! assert_eq!(current.data_get("values.subdomain"), Some(&json!("parks")));
//! ```

pub mod cli;
pub mod collaborators;
pub mod config;
pub mod constants;
pub mod core;
pub mod layout;
pub mod migration;
pub mod naming;
pub mod templating;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
