use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_MAX_RETRIES;
use crate::constants::DEFAULT_RETRY_BACKOFF_MS;
use crate::Error;
use crate::Result;

/// Reconnect policy applied when a watch channel drops
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fixed pause before reopening the watch channel (unit: milliseconds)
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Maximum number of consecutive reconnects (0 means unlimited retries)
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Reopen the watch from the revision after the last one delivered
    /// instead of from the store's current state
    #[serde(default)]
    pub resume_from_last_revision: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff_ms: default_backoff_ms(),
            max_retries: default_max_retries(),
            resume_from_last_revision: false,
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_retries == 0
    }

    pub fn validate(&self) -> Result<()> {
        if self.backoff_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "retry.backoff_ms must be greater than 0".into(),
            )));
        }
        Ok(())
    }
}

fn default_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF_MS
}
fn default_max_retries() -> usize {
    DEFAULT_MAX_RETRIES
}
