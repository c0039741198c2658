//! Test utilities for sitedoc
//!
//! This module provides in-memory collaborators and document fixtures so flows can
//! be exercised without touching the filesystem or a provisioning service.
//!
//! - [`MemoryStore`]: documents, resources, type keyword search and a domain registry
//!   behind a mutex
//! - [`RecordingProvisioner`]: records every provisioning call and can be told to fail
//!   specific ones
//! - [`fixtures`]: legacy and current site documents, layouts and templates
//!
//! # Example
//!
//! ```rust,no_run
//! use sitedoc::collaborators::DocumentStore;
//! use sitedoc::test_utils::{MemoryStore, fixtures};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let store = MemoryStore::new();
//! let id = store.create(&fixtures::legacy_site()).await?;
//! assert!(store.contains(&id));
//! # Ok(())
//! # }
//! ```

pub mod doubles;
pub mod fixtures;

pub use doubles::{MemoryStore, ProvisionCall, RecordingProvisioner};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call installs a subscriber. With `level` set that level is used,
/// otherwise `RUST_LOG` decides; when neither is given nothing is logged.
///
/// ```bash
/// RUST_LOG=sitedoc=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
