//! Core types for sitedoc
//!
//! This module holds the document model every other component operates on and the
//! error taxonomy they report through.
//!
//! - [`Document`], [`Item`], [`DocumentKind`]: the persisted unit of content
//! - [`SiteError`]: strongly-typed failures grouped into validation, not-found,
//!   collaborator and environment-mismatch categories
//! - [`ErrorContext`] / [`user_friendly_error`]: terminal rendering with suggestions
//!
//! # Examples
//!
//! ```rust
//! use sitedoc::core::{Document, DocumentKind};
//! use serde_json::json;
//!
//! let doc = Document::from_value(json!({
//!     "item": { "id": "abc", "title": "Parks", "type": "Hub Site Application" },
//!     "data": { "values": {} }
//! }))
//! .unwrap();
//! assert_eq!(doc.kind(), DocumentKind::Site);
//! ```

pub mod document;
pub mod error;

pub use document::{Document, DocumentKind, Item, SCHEMA_VERSION_KEY};
pub use error::{ErrorContext, SiteError, user_friendly_error};
