//! Configuration management.
//!
//! [`Config`] is loaded from environment variables by the binary;
//! [`SyncConfig`] tunes one engine and is built in code by library users.

use std::env;
use std::time::Duration;

/// What to do when a remote write is rejected or times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Keep the optimistic value; the sweep evicts it once it is older than
    /// the pending TTL.
    #[default]
    KeepOptimistic,
    /// Revert the id to its last snapshot value as soon as the failure is known.
    Rollback,
}

impl std::str::FromStr for WritePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" | "keep-optimistic" => Ok(WritePolicy::KeepOptimistic),
            "rollback" => Ok(WritePolicy::Rollback),
            other => Err(ConfigError::InvalidWritePolicy(other.to_string())),
        }
    }
}

/// Exponential backoff for resubscribing after a stream failure.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum consecutive failed attempts before giving up; `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any delay.
    pub max_delay: Duration,
    /// Multiplier applied per attempt.
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Retry forever with the default delays.
    pub fn new() -> Self {
        Self {
            max_attempts: None,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }

    /// Sets the maximum number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Check whether another attempt is allowed after `attempt` failures.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt < max)
    }

    /// Delay before retry number `attempt` (1-indexed; 0 means no delay).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Tuning for one synchronization engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Bound for hot-path reads: cache load, first snapshot, identity lookups.
    pub read_timeout: Duration,
    /// Bound for each remote write or delete.
    pub write_timeout: Duration,
    /// Failure handling for remote writes.
    pub write_policy: WritePolicy,
    /// Age after which an unconfirmed ledger entry is evicted; `None` disables the sweep.
    pub pending_ttl: Option<Duration>,
    /// How often the sweep runs.
    pub sweep_interval: Duration,
    /// Resubscription backoff.
    pub retry: RetryConfig,
}

impl SyncConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(10),
            write_policy: WritePolicy::KeepOptimistic,
            pending_ttl: Some(Duration::from_secs(60)),
            sweep_interval: Duration::from_secs(15),
            retry: RetryConfig::default(),
        }
    }

    /// Sets the read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the write timeout.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Sets the write failure policy.
    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    /// Sets the pending TTL used by the sweep.
    pub fn with_pending_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.pending_ttl = ttl;
        self
    }

    /// Sets the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite URL of the local fallback store
    pub local_store_url: String,
    /// Whether a remote store is configured at all
    pub remote_enabled: bool,
    /// Signed-in user for scoped collections
    pub user_id: Option<String>,
    /// Engine tuning
    pub sync: SyncConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let local_store_url = env::var("SHOPFRONT_LOCAL_STORE_URL")
            .unwrap_or_else(|_| "sqlite://shopfront-cache.db?mode=rwc".to_string());

        let remote_enabled = match env::var("SHOPFRONT_REMOTE_ENABLED") {
            Ok(value) => parse_bool(&value)
                .ok_or_else(|| ConfigError::InvalidValue("SHOPFRONT_REMOTE_ENABLED", value))?,
            Err(_) => true,
        };

        let user_id = env::var("SHOPFRONT_USER_ID")
            .ok()
            .filter(|id| !id.trim().is_empty());

        let mut sync = SyncConfig::new();
        if let Some(ms) = parse_u64("SHOPFRONT_READ_TIMEOUT_MS")? {
            sync.read_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_u64("SHOPFRONT_WRITE_TIMEOUT_MS")? {
            sync.write_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_u64("SHOPFRONT_PENDING_TTL_SECS")? {
            sync.pending_ttl = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Ok(policy) = env::var("SHOPFRONT_WRITE_POLICY") {
            sync.write_policy = policy.parse()?;
        }

        Ok(Self {
            local_store_url,
            remote_enabled,
            user_id,
            sync,
        })
    }
}

fn parse_u64(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name, value)),
        Err(_) => Ok(None),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(&'static str, String),

    #[error("invalid write policy: {0:?} (expected \"keep\" or \"rollback\")")]
    InvalidWritePolicy(String),
}
