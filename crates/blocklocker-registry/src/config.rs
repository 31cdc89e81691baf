use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use blocklocker_types::{LockMode, WorldBounds};

use crate::error::ConfigError;

/// Configuration for the lock registry.
///
/// Loaded from TOML; every field is optional and falls back to
/// [`RegistryConfig::default`]:
///
/// ```toml
/// default_mode = "private"
/// max_trusted_per_lock = 16
/// persistence_interval_seconds = 300
/// key_lock_shards = 64
///
/// [bounds]
/// min_y = -64
/// max_y = 319
/// horizontal_limit = 30000000
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Mode used when a lock is created without an explicit mode.
    /// Only `private` and `public` are accepted.
    pub default_mode: LockMode,
    /// Maximum number of trusted actors on a single lock.
    pub max_trusted_per_lock: usize,
    /// Seconds between background snapshot flushes. `0` disables them.
    pub persistence_interval_seconds: u64,
    /// Limits every coordinate key must respect.
    pub bounds: WorldBounds,
    /// Number of shards in the per-key mutex table.
    pub key_lock_shards: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_mode: LockMode::Private,
            max_trusted_per_lock: 16,
            persistence_interval_seconds: 300,
            bounds: WorldBounds::default(),
            key_lock_shards: 64,
        }
    }
}

impl RegistryConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_mode == LockMode::Shared {
            return Err(ConfigError::Invalid(
                "default_mode must be 'private' or 'public'".into(),
            ));
        }
        if self.key_lock_shards == 0 {
            return Err(ConfigError::Invalid("key_lock_shards must be at least 1".into()));
        }
        if self.bounds.min_y > self.bounds.max_y {
            return Err(ConfigError::Invalid(format!(
                "bounds.min_y ({}) is above bounds.max_y ({})",
                self.bounds.min_y, self.bounds.max_y
            )));
        }
        if self.bounds.horizontal_limit < 0 {
            return Err(ConfigError::Invalid(
                "bounds.horizontal_limit must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// The background flush period, or `None` when periodic flushing is off.
    pub fn persistence_interval(&self) -> Option<Duration> {
        match self.persistence_interval_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
