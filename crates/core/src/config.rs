//! Application configuration.
//!
//! Values are layered with the `config` crate: `<config_dir>/pkgshelf/config.json`,
//! then `PKGSHELF_*` environment variables (`__` separates nested keys, e.g.
//! `PKGSHELF_LOOKUP__ENABLED`). Anything left unset takes the serde default.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{catalog::CatalogRules, manifest::snapshot_path};

/// Directory name used under the platform config and data directories.
pub const APP_DIR: &str = "pkgshelf";
/// Configuration file name.
pub const CONFIG_FILE: &str = "config.json";
/// Environment variable prefix.
pub const ENV_PREFIX: &str = "PKGSHELF";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory tree holding package files.
    pub library_root: PathBuf,
    /// Where extracted icons are written; `None` keeps icons in memory.
    pub icon_dir: Option<PathBuf>,
    /// Prefix for icon references handed to consumers.
    pub icon_url_prefix: String,
    /// Location of the persisted catalog snapshot.
    pub catalog_path: PathBuf,
    /// External lookup settings.
    pub lookup: LookupConfig,
    /// Placeholder titles and search aliases used during assembly.
    pub rules: CatalogRules,
}

/// External lookup service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Whether scans query the lookup service at all.
    pub enabled: bool,
    /// Service root, e.g. `https://lookup.example/api`.
    pub base_url: Option<String>,
    /// Locale segment inserted into search URLs.
    pub locale: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Minimum spacing between requests.
    pub min_interval_ms: u64,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: None,
            locale: "en-US".to_string(),
            timeout_secs: 10,
            min_interval_ms: 500,
            user_agent: format!("pkgshelf/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = data_root();
        Self {
            library_root: PathBuf::from("pkgs"),
            icon_dir: Some(data_dir.join("icons")),
            icon_url_prefix: "/static/icons".to_string(),
            catalog_path: snapshot_path(&data_dir),
            lookup: LookupConfig::default(),
            rules: CatalogRules::default(),
        }
    }
}

impl AppConfig {
    /// Default configuration file location.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join(CONFIG_FILE)
    }

    /// Load from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load with `path` as the file layer; a missing file is not an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = Config::builder()
            .add_source(
                File::from(path)
                    .format(FileFormat::Json)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;

        settings
            .try_deserialize()
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }

    /// Persist this configuration as pretty JSON.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create config directory {}", parent.display())
            })?;
        }
        let serialized =
            serde_json::to_string_pretty(self).context("failed to serialize configuration")?;
        fs::write(path, serialized)
            .with_context(|| format!("failed to write config {}", path.display()))
    }
}

/// Write the default configuration file if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = AppConfig::config_path();
    ensure_default_config_at(&path)?;
    Ok(path)
}

/// Write defaults to `path` unless the file is already there.
pub fn ensure_default_config_at(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    info!(path = %path.display(), "writing default configuration");
    AppConfig::default().persist(path)
}

fn data_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
