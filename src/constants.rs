//! Global constants used throughout the sitedoc codebase.
//!
//! This module contains schema versions, naming limits, placeholder tokens and
//! other values shared across the migration, naming and templating modules.
//! Defining them centrally keeps the magic strings of the document format
//! discoverable.

/// Highest schema version the migration chain knows how to produce.
///
/// Documents at or above this version are returned from
/// [`crate::migration::upgrade`] without being cloned.
pub const SCHEMA_HEAD_VERSION: f64 = 1.5;

/// Maximum length of a DNS label, used as the default subdomain ceiling.
pub const DEFAULT_MAX_NAME_LENGTH: usize = 63;

/// Upper bound on allocator probe rounds before giving up.
///
/// The existence predicate is expected to return `false` long before this is hit.
pub const DEFAULT_MAX_PROBE_STEPS: usize = 10_000;

/// Length of the random suffix appended to truncated names.
pub const RANDOM_SUFFIX_LENGTH: usize = 5;

/// Length of the random suffix appended to template keys.
pub const TEMPLATE_KEY_SUFFIX_LENGTH: usize = 8;

/// Placeholder standing in for the document's own identifier inside templates.
pub const APPID_TOKEN: &str = "{{appid}}";

/// Seed used for subdomains when the title cannot produce a basic-Latin slug.
pub const GENERIC_SUBDOMAIN_SEED: &str = "site";

/// Type keyword prefix recording a site's subdomain.
pub const SUBDOMAIN_KEYWORD_PREFIX: &str = "hubsubdomain|";

/// Name prefix of crop resources written for image cards and section backgrounds.
pub const CROP_RESOURCE_PREFIX: &str = "hub-image-crop-";

/// Pattern of autosaved draft snapshots, which never travel with a template.
pub const DRAFT_RESOURCE_PATTERN: &str = r"^draft-\d+\.json$";

/// Default hosted domain under which site hostnames are composed.
pub const DEFAULT_HUB_DOMAIN: &str = "hub.arcgis.com";

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "SITEDOC_CONFIG_PATH";

/// Environment variable overriding the local store directory.
pub const STORE_DIR_ENV: &str = "SITEDOC_STORE";
