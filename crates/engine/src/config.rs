//! Engine configuration from environment variables.

use std::time::Duration;

use leafpress_git::RetryPolicy;

/// Default watchdog timeout: a sync stuck in `syncing` longer than this
/// is marked as failed.
const DEFAULT_WATCHDOG_TIMEOUT_SECS: u64 = 300;

/// How often the watchdog sweeps for stuck syncs.
const DEFAULT_WATCHDOG_INTERVAL_SECS: u64 = 30;

/// Runtime configuration for the engine services.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Syncs in `syncing` longer than this are swept to `error`.
    pub watchdog_timeout: Duration,
    /// Sweep cadence of the watchdog loop.
    pub watchdog_interval: Duration,
    /// Retry policy for transient git host failures.
    pub retry: RetryPolicy,
    /// Author string stamped on commits the engine creates.
    pub commit_author: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            watchdog_timeout: Duration::from_secs(DEFAULT_WATCHDOG_TIMEOUT_SECS),
            watchdog_interval: Duration::from_secs(DEFAULT_WATCHDOG_INTERVAL_SECS),
            retry: RetryPolicy::default(),
            commit_author: "leafpress".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment (reading `.env` if
    /// present), falling back to the documented defaults.
    ///
    /// Variables: `LEAFPRESS_WATCHDOG_TIMEOUT_SECS`,
    /// `LEAFPRESS_WATCHDOG_INTERVAL_SECS`, `LEAFPRESS_RETRY_MAX_ATTEMPTS`,
    /// `LEAFPRESS_COMMIT_AUTHOR`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        if let Some(secs) = env_parse::<u64>("LEAFPRESS_WATCHDOG_TIMEOUT_SECS") {
            config.watchdog_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("LEAFPRESS_WATCHDOG_INTERVAL_SECS") {
            config.watchdog_interval = Duration::from_secs(secs);
        }
        if let Some(attempts) = env_parse::<u32>("LEAFPRESS_RETRY_MAX_ATTEMPTS") {
            config.retry.max_attempts = attempts;
        }
        if let Ok(author) = std::env::var("LEAFPRESS_COMMIT_AUTHOR") {
            config.commit_author = author;
        }
        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
