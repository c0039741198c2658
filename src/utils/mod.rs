//! Cross-cutting utilities for sitedoc
//!
//! - [`path`]: dotted-path get/set/delete over JSON trees
//! - [`text`]: slugs, GUID detection and random suffixes
//! - [`fs`]: atomic JSON file writes used by the local store

pub mod fs;
pub mod path;
pub mod text;

pub use text::{is_basic_latin, is_guid, random_suffix, slugify, subdomain_seed};
