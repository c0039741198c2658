//! Schema migration of stored documents.
//!
//! Every document records the schema it was written with in
//! `item.properties.schemaVersion`. Documents are upgraded lazily when read: the
//! chain applies each [`Migration`] whose target version is above the document's
//! version, in ascending order, bumping the version after each step.
//!
//! | Version | Step                              |
//! |---------|-----------------------------------|
//! | 1       | [`Migration::ApplySiteSchema`]    |
//! | 1.1     | [`Migration::LowercaseDomains`]   |
//! | 1.2     | [`Migration::EnsureCatalog`]      |
//! | 1.3     | [`Migration::PurgeNonGuids`]      |
//! | 1.4     | [`Migration::EnsureTelemetry`]    |
//! | 1.5     | [`Migration::MigrateFeedConfig`]  |
//!
//! A document already at (or past) the head version is returned as
//! [`Cow::Borrowed`], so callers can tell "nothing changed" without comparing
//! trees:
//!
//! ```rust
//! use std::borrow::Cow;
//! use serde_json::json;
//! use sitedoc::core::Document;
//! use sitedoc::migration::upgrade;
//!
//! let doc = Document::from_value(json!({
//!     "item": {"title": "Parks", "type": "Hub Site Application"},
//!     "data": {"values": {"groups": ["4bc", {"id": "fromObj"}]}}
//! }))
//! .unwrap();
//!
//! let upgraded = upgrade(&doc);
//! assert!(matches!(upgraded, Cow::Owned(_)));
//! assert!(matches!(upgrade(&upgraded), Cow::Borrowed(_)));
//! ```
//!
//! Versions are never decremented. Steps can be appended with
//! [`MigrationChain::with_step`] without touching the reducer.

pub mod steps;

use std::borrow::Cow;
use std::fmt;

use crate::constants::SCHEMA_HEAD_VERSION;
use crate::core::Document;

/// Signature of a migration step body.
pub type MigrationFn = fn(&mut Document);

/// One version-gated transformation.
#[derive(Clone, Copy)]
pub enum Migration {
    /// v1: clean group id list, `data.values` present
    ApplySiteSchema,
    /// v1.1: lower-cased hostnames
    LowercaseDomains,
    /// v1.2: groups hoisted into `data.catalog`
    EnsureCatalog,
    /// v1.3: catalog groups restricted to identifiers
    PurgeNonGuids,
    /// v1.4: telemetry settings synthesized from `gacode`
    EnsureTelemetry,
    /// v1.5: DCAT feed configuration moved under `data.feeds`
    MigrateFeedConfig,
    /// A step supplied by the caller
    Custom {
        /// Version the document is at after this step
        target: f64,
        /// Name used in logs
        name: &'static str,
        /// Step body
        apply: MigrationFn,
    },
}

impl Migration {
    /// The standard steps, in ascending target order.
    pub const STANDARD: [Self; 6] = [
        Self::ApplySiteSchema,
        Self::LowercaseDomains,
        Self::EnsureCatalog,
        Self::PurgeNonGuids,
        Self::EnsureTelemetry,
        Self::MigrateFeedConfig,
    ];

    /// Version a document is at once this step has run.
    #[must_use]
    pub const fn target_version(&self) -> f64 {
        match self {
            Self::ApplySiteSchema => 1.0,
            Self::LowercaseDomains => 1.1,
            Self::EnsureCatalog => 1.2,
            Self::PurgeNonGuids => 1.3,
            Self::EnsureTelemetry => 1.4,
            Self::MigrateFeedConfig => 1.5,
            Self::Custom {
                target,
                ..
            } => *target,
        }
    }

    /// Step name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ApplySiteSchema => "apply-site-schema",
            Self::LowercaseDomains => "lowercase-domains",
            Self::EnsureCatalog => "ensure-catalog",
            Self::PurgeNonGuids => "purge-non-guids",
            Self::EnsureTelemetry => "ensure-telemetry",
            Self::MigrateFeedConfig => "migrate-feed-config",
            Self::Custom {
                name,
                ..
            } => *name,
        }
    }

    /// Whether `document` still needs this step.
    #[must_use]
    pub fn is_pending(&self, document: &Document) -> bool {
        document.schema_version().is_none_or(|version| version < self.target_version())
    }

    fn body(&self) -> MigrationFn {
        match self {
            Self::ApplySiteSchema => steps::apply_site_schema,
            Self::LowercaseDomains => steps::lowercase_domains,
            Self::EnsureCatalog => steps::ensure_catalog,
            Self::PurgeNonGuids => steps::purge_non_guids,
            Self::EnsureTelemetry => steps::ensure_telemetry,
            Self::MigrateFeedConfig => steps::migrate_feed_config,
            Self::Custom {
                apply,
                ..
            } => *apply,
        }
    }

    /// Run the step body and record its target version.
    ///
    /// Documents already at or past the target are left untouched.
    pub fn apply(&self, document: &mut Document) {
        if !self.is_pending(document) {
            return;
        }
        (self.body())(document);
        document.set_schema_version(self.target_version());
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Migration({} -> {})", self.name(), self.target_version())
    }
}

/// Apply every pending step of `steps`, in the order given.
///
/// The document is cloned on the first step that applies; if none applies the
/// input is returned borrowed.
#[must_use]
pub fn run_chain<'a>(steps: &[Migration], document: &'a Document) -> Cow<'a, Document> {
    let mut current = Cow::Borrowed(document);
    for step in steps {
        if step.is_pending(&current) {
            let from = current.schema_version();
            step.apply(current.to_mut());
            tracing::debug!(
                "Applied migration {} ({:?} -> {})",
                step.name(),
                from,
                step.target_version()
            );
        }
    }
    current
}

/// An ordered migration catalog.
#[derive(Debug, Clone)]
pub struct MigrationChain {
    steps: Vec<Migration>,
}

impl Default for MigrationChain {
    fn default() -> Self {
        Self::standard()
    }
}

impl MigrationChain {
    /// The standard catalog, headed at [`SCHEMA_HEAD_VERSION`].
    #[must_use]
    pub fn standard() -> Self {
        Self {
            steps: Migration::STANDARD.to_vec(),
        }
    }

    /// Add a step, keeping the catalog sorted by target version.
    ///
    /// Steps with equal targets run in insertion order.
    #[must_use]
    pub fn with_step(mut self, step: Migration) -> Self {
        let index =
            self.steps.partition_point(|s| s.target_version() <= step.target_version());
        self.steps.insert(index, step);
        self
    }

    /// Highest target version in the catalog.
    #[must_use]
    pub fn head_version(&self) -> f64 {
        self.steps.iter().map(Migration::target_version).fold(0.0, f64::max)
    }

    /// The steps, in application order.
    #[must_use]
    pub fn steps(&self) -> &[Migration] {
        &self.steps
    }

    /// Bring `document` to the head version.
    ///
    /// Returns the input borrowed when it is already at or past the head version.
    #[must_use]
    pub fn upgrade<'a>(&self, document: &'a Document) -> Cow<'a, Document> {
        let head = self.head_version();
        if document.schema_version().is_some_and(|version| version >= head) {
            return Cow::Borrowed(document);
        }
        let upgraded = run_chain(&self.steps, document);
        tracing::debug!(
            "Upgraded {} {} from {:?} to {head}",
            document.kind(),
            document.id().unwrap_or("<new>"),
            document.schema_version()
        );
        upgraded
    }
}

/// Bring `document` to [`SCHEMA_HEAD_VERSION`] with the standard steps.
#[must_use]
pub fn upgrade(document: &Document) -> Cow<'_, Document> {
    if document.schema_version().is_some_and(|version| version >= SCHEMA_HEAD_VERSION) {
        return Cow::Borrowed(document);
    }
    run_chain(&Migration::STANDARD, document)
}
