use crate::shared::config::{ConfigError, SyncConfig};
use std::path::{Path, PathBuf};

/// Overrides the backend base URL
pub const ENV_BACKEND_URL: &str = "PLANNING_SYNC_BACKEND_URL";
/// Overrides the shared snapshot key
pub const ENV_STORAGE_KEY: &str = "PLANNING_SYNC_STORAGE_KEY";
/// Overrides the reachability poll interval, in milliseconds
pub const ENV_POLL_INTERVAL_MS: &str = "PLANNING_SYNC_POLL_INTERVAL_MS";

const CONFIG_DIR: &str = "planning-sync";
const CONFIG_FILE: &str = "sync.toml";

/// Client configuration wrapper: file settings plus environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    sync: SyncConfig,
    source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
            source: None,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut sync = SyncConfig::default();
        apply_env(&mut sync)?;
        sync.validate()?;
        Ok(Self { sync, source: None })
    }

    /// Read a TOML file, then apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let mut sync: SyncConfig =
            toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        apply_env(&mut sync)?;
        sync.validate()?;
        tracing::debug!("[SYNC] loaded config from {}", path.display());
        Ok(Self {
            sync,
            source: Some(path.to_path_buf()),
        })
    }

    /// Load the default file if it exists, otherwise fall back to [`Config::from_env`]
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Self::from_env(),
        }
    }

    /// `<config_dir>/planning-sync/sync.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn sync(&self) -> &SyncConfig {
        &self.sync
    }

    /// File the settings were read from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn backend_url(&self) -> &str {
        &self.sync.backend_url
    }

    pub fn storage_key(&self) -> &str {
        &self.sync.storage_key
    }
}

fn apply_env(sync: &mut SyncConfig) -> Result<(), ConfigError> {
    if let Ok(url) = std::env::var(ENV_BACKEND_URL) {
        sync.backend_url = url;
    }
    if let Ok(key) = std::env::var(ENV_STORAGE_KEY) {
        sync.storage_key = key;
    }
    if let Ok(raw) = std::env::var(ENV_POLL_INTERVAL_MS) {
        sync.poll_interval_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            field: "poll_interval_ms",
            message: format!("{} is not a number of milliseconds: {:?}", ENV_POLL_INTERVAL_MS, raw),
        })?;
    }
    Ok(())
}
