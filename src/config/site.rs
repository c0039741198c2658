//! User configuration for sitedoc.
//!
//! The configuration file (`~/.sitedoc/config.toml`) records which deployment the
//! tool is talking to and the limits used when naming new sites:
//!
//! ```toml
//! environment = "hosted"
//! org_key = "cityofx"
//! org_id = "Xj56SBi2udA78cC9"
//! hub_domain = "hub.arcgis.com"
//! max_subdomain_length = 63
//! store_dir = "/var/lib/sitedoc"
//! ```
//!
//! The location can be overridden with the `SITEDOC_CONFIG_PATH` environment variable
//! or the `--config` command line flag. A missing file yields the defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::constants::{
    CONFIG_PATH_ENV, DEFAULT_HUB_DOMAIN, DEFAULT_MAX_NAME_LENGTH, DEFAULT_MAX_PROBE_STEPS,
};
use crate::core::SiteError;

/// Deployment mode of the platform sitedoc talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Environment {
    /// Multi-tenant hosted platform; subdomains live in a shared domain registry
    #[default]
    Hosted,
    /// Customer-managed portal; subdomains are recorded as item type keywords
    SelfManaged,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hosted => write!(f, "hosted"),
            Self::SelfManaged => write!(f, "self-managed"),
        }
    }
}

impl Environment {
    /// Item type name given to site templates and sites in this environment.
    #[must_use]
    pub const fn site_type(self) -> &'static str {
        match self {
            Self::Hosted => "Hub Site Application",
            Self::SelfManaged => "Site Application",
        }
    }

    /// Item type name given to page templates and pages in this environment.
    #[must_use]
    pub const fn page_type(self) -> &'static str {
        match self {
            Self::Hosted => "Hub Page",
            Self::SelfManaged => "Site Page",
        }
    }
}

/// Configuration structure for sitedoc.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Deployment mode
    pub environment: Environment,
    /// Short organization key appended to hosted subdomains
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_key: Option<String>,
    /// Organization identifier exposed to templates as `organization.id`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    /// Domain under which hosted site hostnames are composed
    pub hub_domain: String,
    /// Portal hostname for self-managed deployments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portal_hostname: Option<String>,
    /// Ceiling for generated subdomains (DNS label limit)
    pub max_subdomain_length: usize,
    /// Upper bound on name allocator probe rounds
    pub max_probe_steps: usize,
    /// Directory of the local document store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            org_key: None,
            org_id: None,
            hub_domain: DEFAULT_HUB_DOMAIN.to_string(),
            portal_hostname: None,
            max_subdomain_length: DEFAULT_MAX_NAME_LENGTH,
            max_probe_steps: DEFAULT_MAX_PROBE_STEPS,
            store_dir: None,
        }
    }
}

impl SiteConfig {
    /// Load configuration from an optional path, falling back to the default location.
    ///
    /// Returns the defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if fs::try_exists(&path).await.unwrap_or(false) {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, and [`SiteError::ConfigError`] if
    /// it contains invalid TOML.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content).map_err(|err| {
            SiteError::ConfigError {
                message: format!("Failed to parse config from {}: {err}", path.display()),
            }
            .into()
        })
    }

    /// Save configuration to a specific file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Default configuration path: `$SITEDOC_CONFIG_PATH` or `~/.sitedoc/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("sitedoc")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".sitedoc")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Characters that hosted hostnames append after the subdomain (`-<org_key>`).
    ///
    /// Self-managed deployments do not decorate subdomains, so the penalty is zero.
    #[must_use]
    pub fn subdomain_length_penalty(&self) -> usize {
        match (self.environment, &self.org_key) {
            (Environment::Hosted, Some(key)) => key.len() + 1,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_save_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.toml");

        let config = SiteConfig {
            environment: Environment::SelfManaged,
            portal_hostname: Some("portal.city.gov".to_string()),
            ..SiteConfig::default()
        };
        config.save_to(&path).await.unwrap();

        let loaded = SiteConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let loaded =
            SiteConfig::load_with_optional(Some(temp.path().join("absent.toml"))).await.unwrap();
        assert_eq!(loaded, SiteConfig::default());
        assert_eq!(loaded.max_subdomain_length, 63);
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        tokio::fs::write(&path, "environment = \"self-managed\"\n").await.unwrap();

        let loaded = SiteConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded.environment, Environment::SelfManaged);
        assert_eq!(loaded.hub_domain, DEFAULT_HUB_DOMAIN);
    }

    #[tokio::test]
    async fn test_invalid_toml_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        tokio::fs::write(&path, "environment = [").await.unwrap();

        let err = SiteConfig::load_from(&path).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<SiteError>(), Some(SiteError::ConfigError { .. })));
        let friendly = crate::core::user_friendly_error(err);
        assert!(friendly.suggestion.is_some());
    }

    #[test]
    #[serial_test::serial]
    fn test_default_path_env_override() {
        // SAFETY: serialized with every other test touching the environment
        unsafe { std::env::set_var(CONFIG_PATH_ENV, "/tmp/sitedoc-test/config.toml") };
        let path = SiteConfig::default_path().unwrap();
        unsafe { std::env::remove_var(CONFIG_PATH_ENV) };
        assert_eq!(path, PathBuf::from("/tmp/sitedoc-test/config.toml"));
    }

    #[test]
    fn test_length_penalty() {
        let mut config = SiteConfig {
            org_key: Some("cityofx".to_string()),
            ..SiteConfig::default()
        };
        assert_eq!(config.subdomain_length_penalty(), 8);
        config.environment = Environment::SelfManaged;
        assert_eq!(config.subdomain_length_penalty(), 0);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Environment::Hosted.site_type(), "Hub Site Application");
        assert_eq!(Environment::SelfManaged.page_type(), "Site Page");
    }
}
