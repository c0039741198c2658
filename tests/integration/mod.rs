//! Integration test suite for sitedoc
//!
//! End-to-end tests over the public API and the `sitedoc` binary.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **migration**: schema upgrades of realistic legacy documents
//! - **template_roundtrip**: convert a site, then instantiate the template
//! - **materialize**: collaborator interaction and failure reporting
//! - **cli**: the `sitedoc` binary against a temporary store

mod cli;
mod materialize;
mod migration;
mod template_roundtrip;
