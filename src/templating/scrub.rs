//! Textual identifier substitution.
//!
//! Converting a live document into a template must remove every reference to the
//! document's own identifier, and creating a record from a template must put the new
//! identifier back. Both directions are plain text replacement over the serialized
//! JSON. This matches substrings anywhere, including inside unrelated values that
//! happen to contain the identifier; callers that need a structural walk should
//! replace this module rather than work around it.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::constants::APPID_TOKEN;

/// Replace every occurrence of `needle` in the serialized form of `value`.
///
/// # Errors
///
/// Returns an error if `value` does not serialize, or if the replacement produces
/// JSON that no longer deserializes into `T` (e.g. `needle` contained a quote).
pub fn replace_text<T>(value: &T, needle: &str, replacement: &str) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let serialized = serde_json::to_string(value).context("Failed to serialize for substitution")?;
    if needle.is_empty() || !serialized.contains(needle) {
        return serde_json::from_str(&serialized).context("Failed to reparse after substitution");
    }
    let replaced = serialized.replace(needle, replacement);
    serde_json::from_str(&replaced)
        .with_context(|| format!("Substituting '{needle}' produced invalid JSON"))
}

/// Replace the identifier `id` with the `{{appid}}` placeholder.
///
/// # Errors
///
/// See [`replace_text`].
pub fn scrub_identifier<T>(value: &T, id: &str) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    replace_text(value, id, APPID_TOKEN)
}

/// Replace the `{{appid}}` placeholder with a newly created identifier.
///
/// # Errors
///
/// See [`replace_text`].
pub fn restore_identifier<T>(value: &T, id: &str) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    replace_text(value, APPID_TOKEN, id)
}
