//! String helpers for names, keys and identifiers.

use regex::Regex;
use std::sync::LazyLock;

use crate::constants::GENERIC_SUBDOMAIN_SEED;

static GUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-?[0-9a-f]{4}-?[0-9a-f]{4}-?[0-9a-f]{4}-?[0-9a-f]{12}$")
        .expect("GUID pattern is a valid regex")
});

/// Convert a title into a lowercase, hyphen-separated slug.
///
/// Runs of characters outside `[a-z0-9]` collapse into a single hyphen, and leading
/// or trailing hyphens are trimmed.
///
/// # Examples
///
/// ```rust
/// use sitedoc::utils::slugify;
///
/// assert_eq!(slugify("  City Parks & Recreation! "), "city-parks-recreation");
/// assert_eq!(slugify("2024 Budget"), "2024-budget");
/// ```
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for ch in title.chars() {
        let lower = ch.to_ascii_lowercase();
        if lower.is_ascii_lowercase() || lower.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(lower);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Whether every character of `text` is in the basic Latin (ASCII) block.
#[must_use]
pub fn is_basic_latin(text: &str) -> bool {
    text.is_ascii()
}

/// Seed for a new subdomain derived from a site title.
///
/// Titles containing characters outside the basic Latin range, or titles that slugify
/// to nothing, fall back to a generic seed so that non-ASCII subdomains are never
/// generated.
#[must_use]
pub fn subdomain_seed(title: &str) -> String {
    if !is_basic_latin(title) {
        return GENERIC_SUBDOMAIN_SEED.to_string();
    }
    let slug = slugify(title);
    if slug.is_empty() {
        GENERIC_SUBDOMAIN_SEED.to_string()
    } else {
        slug
    }
}

/// Whether `value` looks like a platform identifier (a GUID, dashes optional).
#[must_use]
pub fn is_guid(value: &str) -> bool {
    GUID_PATTERN.is_match(value)
}

/// Generate `length` random lowercase alphanumeric characters.
///
/// Characters come from v4 UUID hex digits, so the alphabet is `0-9a-f`.
#[must_use]
pub fn random_suffix(length: usize) -> String {
    let mut out = String::with_capacity(length);
    while out.len() < length {
        let chunk = uuid::Uuid::new_v4().simple().to_string();
        let needed = length - out.len();
        out.extend(chunk.chars().take(needed));
    }
    out
}
