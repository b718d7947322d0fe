//! Sync configuration module
//!
//! Provides the timing constants and collaborator settings for the sync core.
//! Timings are stored in milliseconds so the struct reads naturally from TOML.

use crate::shared::change::ResourceFamily;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default grace window after an edit-end
pub const DEFAULT_EDIT_GRACE_MS: u64 = 1_500;
/// Default delay between the end of the grace window and a deferred refresh
pub const DEFAULT_DEFERRED_REFRESH_MS: u64 = 1_000;
/// Default UI debounce applied by the refresh dispatcher
pub const DEFAULT_UI_DEBOUNCE_MS: u64 = 300;
/// Default settle delay for bursts of realtime notifications
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 300;
/// Default reachability poll interval
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 15_000;
/// Default upper bound for one reachability probe
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 10_000;
/// Well-known key holding the shared planning snapshot
pub const DEFAULT_STORAGE_KEY: &str = "planning-data";
/// Default backend base URL
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:54321";

/// Sync core configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Grace window after edit-end before editing counts as finished
    pub edit_grace_ms: u64,
    /// Delay before a deferred refresh runs once the grace window lapses
    pub deferred_refresh_ms: u64,
    /// Debounce between a data-changed event and the refresh request
    pub ui_debounce_ms: u64,
    /// Settle delay collapsing bursts of realtime notifications
    pub settle_delay_ms: u64,
    /// Reachability poll interval
    pub poll_interval_ms: u64,
    /// Upper bound for a single reachability probe
    pub probe_timeout_ms: u64,
    /// Persistent key holding the shared planning snapshot
    pub storage_key: String,
    /// Resource families to open realtime channels for
    pub families: Vec<ResourceFamily>,
    /// Backend base URL
    pub backend_url: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            edit_grace_ms: DEFAULT_EDIT_GRACE_MS,
            deferred_refresh_ms: DEFAULT_DEFERRED_REFRESH_MS,
            ui_debounce_ms: DEFAULT_UI_DEBOUNCE_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            families: ResourceFamily::ALL.to_vec(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
        }
    }
}

impl SyncConfig {
    /// Create a new SyncConfigBuilder
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Parse a TOML document; missing fields take their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig =
            toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::invalid("poll_interval_ms", "must be greater than zero"));
        }
        if self.probe_timeout_ms == 0 {
            return Err(ConfigError::invalid("probe_timeout_ms", "must be greater than zero"));
        }
        if self.probe_timeout_ms > self.poll_interval_ms {
            return Err(ConfigError::invalid(
                "probe_timeout_ms",
                "must not exceed poll_interval_ms",
            ));
        }
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::invalid("storage_key", "must not be empty"));
        }
        if self.families.is_empty() {
            return Err(ConfigError::invalid("families", "at least one family is required"));
        }
        if !(self.backend_url.starts_with("http://") || self.backend_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(self.backend_url.clone()));
        }
        Ok(())
    }

    pub fn edit_grace(&self) -> Duration {
        Duration::from_millis(self.edit_grace_ms)
    }

    pub fn deferred_refresh(&self) -> Duration {
        Duration::from_millis(self.deferred_refresh_ms)
    }

    pub fn ui_debounce(&self) -> Duration {
        Duration::from_millis(self.ui_debounce_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Health endpoint probed by the HTTP reachability probe
    pub fn health_url(&self) -> String {
        format!("{}/health", self.backend_url.trim_end_matches('/'))
    }
}

/// Builder for SyncConfig
#[derive(Debug, Default)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

/// Whole milliseconds, saturating at `u64::MAX`
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl SyncConfigBuilder {
    pub fn edit_grace(mut self, grace: Duration) -> Self {
        self.config.edit_grace_ms = millis(grace);
        self
    }

    pub fn deferred_refresh(mut self, delay: Duration) -> Self {
        self.config.deferred_refresh_ms = millis(delay);
        self
    }

    pub fn ui_debounce(mut self, delay: Duration) -> Self {
        self.config.ui_debounce_ms = millis(delay);
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.config.settle_delay_ms = millis(delay);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval_ms = millis(interval);
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout_ms = millis(timeout);
        self
    }

    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.config.storage_key = key.into();
        self
    }

    pub fn families(mut self, families: Vec<ResourceFamily>) -> Self {
        self.config.families = families;
        self
    }

    /// Set the backend URL
    pub fn backend_url(mut self, url: impl Into<String>) -> Self {
        self.config.backend_url = url.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<SyncConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: &'static str, message: String },
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("failed to read config: {0}")]
    Io(String),
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            message: message.into(),
        }
    }
}
