// -
// Session defaults

/// Resync interval used when none is configured: 10 minutes
pub(crate) const DEFAULT_RESYNC_INTERVAL_MS: u64 = 10 * 60 * 1000;

/// Fixed pause between a dropped watch channel and the next reconnect
pub(crate) const DEFAULT_RETRY_BACKOFF_MS: u64 = 3000;

/// 0 means reconnect forever
pub(crate) const DEFAULT_MAX_RETRIES: usize = 0;

// -
// Configuration sources

/// Environment variable prefix, e.g. `NSWATCH__RETRY__BACKOFF_MS`
pub(crate) const ENV_PREFIX: &str = "NSWATCH";

/// Environment variable naming an optional TOML config file
pub(crate) const ENV_CONFIG_PATH: &str = "NSWATCH_CONFIG_PATH";

// -
// In-memory store

/// Number of mutations retained for revision-based watch replay
pub(crate) const MEM_STORE_HISTORY_LIMIT: usize = 4096;

/// Length of generated session ids
pub(crate) const SESSION_ID_LEN: usize = 10;
