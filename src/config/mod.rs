//! Configuration management for watch sessions.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
mod retry;
pub use retry::*;


use std::env;
use std::time::Duration;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_RESYNC_INTERVAL_MS;
use crate::constants::ENV_CONFIG_PATH;
use crate::constants::ENV_PREFIX;
use crate::Error;
use crate::Result;

/// Settings of a single watch session
///
/// Combines all tunables with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `NSWATCH_CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Namespace whose keys are watched, without surrounding slashes
    #[serde(default)]
    pub namespace: String,

    /// Interval between full resyncs (unit: milliseconds)
    /// Default: 10 minutes
    #[serde(default = "default_resync_interval_ms")]
    pub resync_interval_ms: u64,

    /// Watch channel reconnect policy
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            resync_interval_ms: default_resync_interval_ms(),
            retry: RetryPolicy::default(),
        }
    }
}

impl WatcherConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Configuration sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `NSWATCH_CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `NSWATCH__` prefix (highest priority)
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("NSWATCH__NAMESPACE", "services");
    /// std::env::set_var("NSWATCH__RETRY__BACKOFF_MS", "500");
    /// let cfg = WatcherConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var(ENV_CONFIG_PATH) {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        let config: Self = builder.add_source(env_source()).build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates configuration and returns validated instance.
    pub fn validate(self) -> Result<Self> {
        if self.resync_interval_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "resync_interval_ms must be greater than 0".into(),
            )));
        }
        self.retry.validate()?;
        Ok(self)
    }

    /// Defaults, `NSWATCH_CONFIG_PATH`, optional `path` and environment,
    /// validated.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config = Self::new()?;
        match path {
            Some(p) => config.with_override_config(p)?.validate(),
            None => config.validate(),
        }
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_millis(self.resync_interval_ms)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}

fn default_resync_interval_ms() -> u64 {
    DEFAULT_RESYNC_INTERVAL_MS
}
