//! Configuration for keeping the search index in step with the database.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::Refresh;

/// How mutations reach the search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Write the row, then write the document before returning.
    /// Read-your-writes, but a failed index leg leaves the stores diverged.
    #[default]
    Synchronous,

    /// Write the row and an outbox entry in one transaction; a relay applies
    /// the entry to the index, retrying until it sticks.
    Outbox,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Synchronous => write!(f, "synchronous"),
            SyncMode::Outbox => write!(f, "outbox"),
        }
    }
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "synchronous" | "sync" => Ok(SyncMode::Synchronous),
            "outbox" => Ok(SyncMode::Outbox),
            other => Err(format!("unknown sync mode '{}'", other)),
        }
    }
}

/// Sync engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Sync mode.
    #[serde(default)]
    pub mode: SyncMode,

    /// In outbox mode, also attempt the index write before returning.
    #[serde(default = "default_inline_apply")]
    pub inline_apply: bool,

    /// Refresh policy for single-document index writes.
    #[serde(default = "default_refresh")]
    pub refresh: Refresh,

    /// Deadline for each leg of a dual write.
    #[serde(with = "humantime_serde", default = "default_operation_timeout")]
    pub operation_timeout: Duration,

    /// Maximum outbox entries the relay drains per pass.
    #[serde(default = "default_relay_batch_size")]
    pub relay_batch_size: usize,

    /// Failed relay passes after which an entry is dead-lettered.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// How long applied outbox entries are kept before the relay purges them.
    #[serde(with = "humantime_serde", default = "default_outbox_retention")]
    pub outbox_retention: Duration,

    /// Relay retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_inline_apply() -> bool {
    true
}

fn default_refresh() -> Refresh {
    Refresh::True
}

fn default_operation_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_relay_batch_size() -> usize {
    100
}

fn default_max_attempts() -> u32 {
    5
}

fn default_outbox_retention() -> Duration {
    Duration::from_secs(7 * 24 * 60 * 60)
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            mode: SyncMode::default(),
            inline_apply: default_inline_apply(),
            refresh: default_refresh(),
            operation_timeout: default_operation_timeout(),
            relay_batch_size: default_relay_batch_size(),
            max_attempts: default_max_attempts(),
            outbox_retention: default_outbox_retention(),
            retry: RetryConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Returns a synchronous-mode config.
    pub fn synchronous() -> Self {
        Self::default()
    }

    /// Returns an outbox-mode config.
    pub fn outbox(inline_apply: bool) -> Self {
        Self {
            mode: SyncMode::Outbox,
            inline_apply,
            ..Self::default()
        }
    }

    /// Sets the per-leg deadline.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Sets how many failed relay passes an entry gets before it is dead-lettered.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets how long applied outbox entries are kept.
    pub fn with_outbox_retention(mut self, retention: Duration) -> Self {
        self.outbox_retention = retention;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Retry configuration for relay attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial delay between retries.
    #[serde(with = "humantime_serde", default = "default_initial_delay")]
    pub initial_delay: Duration,

    /// Maximum delay between retries.
    #[serde(with = "humantime_serde", default = "default_max_delay")]
    pub max_delay: Duration,

    /// Backoff multiplier.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Returns the delay to wait after `delay`, capped at `max_delay`.
    ///
    /// A multiplier that yields no valid duration (negative, NaN, overflow)
    /// falls back to `max_delay`.
    pub fn next_delay(&self, delay: Duration) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.backoff_multiplier)
            .map_or(self.max_delay, |next| next.min(self.max_delay))
    }
}

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
