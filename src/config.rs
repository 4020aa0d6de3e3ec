//! Scheduler configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for the repeatable job scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSchedulerConfig {
    /// Redis connection configuration.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Scheduler key-namespace and behavior configuration.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            redis: RedisConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// Redis connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL.
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_pool_size(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl RedisConfig {
    /// Returns the connection timeout as a `Duration`.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_pool_size() -> usize {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

/// Scheduler key-namespace and behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Key prefix shared by the index, definition hashes, and instances.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Default iteration limit applied when a `RepeatOptions` omits
    /// one explicitly. `None` means unlimited.
    #[serde(default)]
    pub default_limit: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            default_limit: None,
        }
    }
}

fn default_key_prefix() -> String {
    "repeatable-jobs".to_string()
}
