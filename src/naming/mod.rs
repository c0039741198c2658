//! Unique subdomain allocation.
//!
//! New sites need a subdomain nobody else uses. Starting from a base name the
//! allocator probes `base`, `base-1`, `base-2`, ... until a free candidate is found:
//!
//! ```text
//! step 0  -> foobar      (taken)
//! step 1  -> foobar-1    (taken)
//! step 2  -> foobar-2    (free)  => "foobar-2"
//! ```
//!
//! If the free candidate plus the hostname decoration that will be appended to it
//! (the `length_penalty`) would exceed `max_length`, the candidate is cut down and a
//! random 5 character suffix is appended so the final hostname stays within DNS
//! limits. The truncated name is not probed again; collisions at that point are
//! left to the randomness of the suffix.
//!
//! Existence can be answered synchronously ([`allocate`]) or through an async
//! [`ExistenceProbe`] ([`allocate_with_probe`]). Two probes are provided:
//! [`HostedDomainProbe`] for the hosted domain registry and [`KeywordSearchProbe`]
//! for self-managed deployments, where subdomains are recorded as type keywords.

use anyhow::Result;

use crate::collaborators::{DomainRegistry, ExistenceProbe, HostFormatter, RecordSearch};
use crate::config::{Environment, SiteConfig};
use crate::constants::{
    DEFAULT_MAX_NAME_LENGTH, DEFAULT_MAX_PROBE_STEPS, RANDOM_SUFFIX_LENGTH,
    SUBDOMAIN_KEYWORD_PREFIX,
};
use crate::core::SiteError;
use crate::utils::random_suffix;

/// Bounds applied while allocating a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameLimits {
    /// Maximum length of the decorated name
    pub max_length: usize,
    /// Characters appended to the name after allocation
    pub length_penalty: usize,
    /// Maximum number of probe rounds before giving up
    pub max_steps: usize,
}

impl Default for NameLimits {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_NAME_LENGTH,
            length_penalty: 0,
            max_steps: DEFAULT_MAX_PROBE_STEPS,
        }
    }
}

impl NameLimits {
    /// Limits for subdomains in the configured deployment.
    #[must_use]
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            max_length: config.max_subdomain_length,
            length_penalty: config.subdomain_length_penalty(),
            max_steps: config.max_probe_steps,
        }
    }

    fn budget(&self) -> usize {
        self.max_length.saturating_sub(self.length_penalty)
    }
}

/// A base name and the probe round it is on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCandidate {
    /// The name being made unique
    pub base: String,
    /// Probe round, zero for the bare base
    pub step: usize,
}

impl NameCandidate {
    /// First candidate for `base`.
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            step: 0,
        }
    }

    /// `base` at step zero, `base-step` afterwards.
    #[must_use]
    pub fn combined(&self) -> String {
        if self.step == 0 {
            self.base.clone()
        } else {
            format!("{}-{}", self.base, self.step)
        }
    }

    fn advance(&mut self) {
        self.step += 1;
    }
}

/// Allocate a unique name using a synchronous existence predicate.
///
/// # Errors
///
/// Returns [`SiteError::InvalidName`] for an empty base or a length budget under
/// seven characters, and [`SiteError::ProbeLimitExceeded`] when `limits.max_steps`
/// rounds all find the candidate taken.
///
/// # Examples
///
/// ```rust
/// use sitedoc::naming::{NameLimits, allocate};
///
/// let taken = ["foobar", "foobar-1"];
/// let name = allocate("foobar", |c| taken.contains(&c), NameLimits::default()).unwrap();
/// assert_eq!(name, "foobar-2");
/// ```
pub fn allocate<F>(base: &str, mut exists: F, limits: NameLimits) -> Result<String>
where
    F: FnMut(&str) -> bool,
{
    validate(base, &limits)?;

    let mut candidate = NameCandidate::new(base);
    loop {
        let combined = candidate.combined();
        if !exists(&combined) {
            return Ok(fit_length(combined, &limits));
        }
        candidate.advance();
        check_steps(&candidate, &limits)?;
    }
}

/// Allocate a unique name, asking `probe` whether each candidate is taken.
///
/// Probes run one at a time; a probe error aborts the allocation.
///
/// # Errors
///
/// Same validation errors as [`allocate`], plus any error returned by the probe.
pub async fn allocate_with_probe<P>(base: &str, probe: &P, limits: NameLimits) -> Result<String>
where
    P: ExistenceProbe + ?Sized,
{
    validate(base, &limits)?;

    let mut candidate = NameCandidate::new(base);
    loop {
        let combined = candidate.combined();
        if !probe.exists(&combined).await? {
            tracing::debug!("Allocated '{combined}' after {} probe(s)", candidate.step + 1);
            return Ok(fit_length(combined, &limits));
        }
        tracing::debug!("Name '{combined}' is taken");
        candidate.advance();
        check_steps(&candidate, &limits)?;
    }
}

fn validate(base: &str, limits: &NameLimits) -> Result<()> {
    if base.is_empty() {
        return Err(SiteError::InvalidName {
            name: base.to_string(),
            reason: "base name is empty".to_string(),
        }
        .into());
    }
    if limits.budget() < RANDOM_SUFFIX_LENGTH + 2 {
        return Err(SiteError::InvalidName {
            name: base.to_string(),
            reason: format!(
                "max length {} minus penalty {} leaves no room for a name",
                limits.max_length, limits.length_penalty
            ),
        }
        .into());
    }
    Ok(())
}

fn check_steps(candidate: &NameCandidate, limits: &NameLimits) -> Result<()> {
    if candidate.step >= limits.max_steps {
        return Err(SiteError::ProbeLimitExceeded {
            base: candidate.base.clone(),
            steps: candidate.step,
        }
        .into());
    }
    Ok(())
}

/// Truncate and randomize a name whose decorated form would be too long.
fn fit_length(name: String, limits: &NameLimits) -> String {
    if name.len() + limits.length_penalty <= limits.max_length {
        return name;
    }

    let keep = limits.budget() - RANDOM_SUFFIX_LENGTH - 1;
    // Names are slugs, but never split a multi-byte character.
    let mut cut = keep.min(name.len());
    while !name.is_char_boundary(cut) {
        cut -= 1;
    }
    let truncated = format!("{}-{}", &name[..cut], random_suffix(RANDOM_SUFFIX_LENGTH));
    tracing::debug!("Truncated '{name}' to '{truncated}'");
    truncated
}

/// Probes the hosted domain registry for `<candidate>-<org_key>.<hub_domain>`.
#[derive(Debug)]
pub struct HostedDomainProbe<'a, R, H> {
    registry: &'a R,
    formatter: &'a H,
}

impl<'a, R, H> HostedDomainProbe<'a, R, H>
where
    R: DomainRegistry,
    H: HostFormatter,
{
    /// Create a probe over `registry`, composing hostnames with `formatter`.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::EnvironmentMismatch`] in a self-managed deployment, which has
    /// no domain registry.
    pub fn new(config: &SiteConfig, registry: &'a R, formatter: &'a H) -> Result<Self> {
        if config.environment != Environment::Hosted {
            return Err(SiteError::EnvironmentMismatch {
                operation: "hosted domain probe".to_string(),
                required: Environment::Hosted,
                actual: config.environment,
            }
            .into());
        }
        Ok(Self {
            registry,
            formatter,
        })
    }
}

impl<R, H> ExistenceProbe for HostedDomainProbe<'_, R, H>
where
    R: DomainRegistry,
    H: HostFormatter,
{
    async fn exists(&self, candidate: &str) -> Result<bool> {
        let hostname = self.formatter.hostname(candidate);
        Ok(self.registry.lookup_hostname(&hostname).await?.is_some())
    }
}

/// Probes for records carrying the `hubsubdomain|<candidate>` type keyword.
#[derive(Debug)]
pub struct KeywordSearchProbe<'a, S> {
    search: &'a S,
}

impl<'a, S: RecordSearch> KeywordSearchProbe<'a, S> {
    /// Create a probe over `search`.
    pub const fn new(search: &'a S) -> Self {
        Self {
            search,
        }
    }
}

impl<S: RecordSearch> ExistenceProbe for KeywordSearchProbe<'_, S> {
    async fn exists(&self, candidate: &str) -> Result<bool> {
        let keyword = subdomain_keyword(candidate);
        Ok(!self.search.search_by_type_keyword(&keyword).await?.is_empty())
    }
}

/// Type keyword recording a site's subdomain.
#[must_use]
pub fn subdomain_keyword(subdomain: &str) -> String {
    format!("{SUBDOMAIN_KEYWORD_PREFIX}{subdomain}")
}
