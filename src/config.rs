//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{CacheTier, TierConfig};
use crate::error::{CacheError, Result};

/// Connection settings for the remote Redis store.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Connection string, e.g. `redis://localhost:6379`
    pub url: String,
    /// Prefix applied to every key written to Redis
    pub prefix: String,
    /// Upper bound on establishing a connection
    pub connect_timeout: Duration,
    /// Upper bound on a single command
    pub operation_timeout: Duration,
    /// Minimum delay between reconnection attempts
    pub reconnect_interval: Duration,
}

impl RedisConfig {
    /// Creates a Redis config for `url` with default timeouts.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            prefix: "response-cache:".to_string(),
            connect_timeout: Duration::from_millis(1000),
            operation_timeout: Duration::from_millis(500),
            reconnect_interval: Duration::from_secs(5),
        }
    }
}

/// Server and cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Remote store settings; `None` runs the in-memory store only
    pub redis: Option<RedisConfig>,
    /// Maximum number of entries per in-memory tier
    pub max_entries: usize,
    /// Short tier TTL and sweep interval
    pub short: TierConfig,
    /// Medium tier TTL and sweep interval
    pub medium: TierConfig,
    /// Long tier TTL and sweep interval
    pub long: TierConfig,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `REDIS_URL` - Redis connection string (unset: in-memory only)
    /// - `REDIS_PREFIX` - Key prefix in Redis (default: `response-cache:`)
    /// - `REDIS_CONNECT_TIMEOUT_MS` - Connect timeout (default: 1000)
    /// - `REDIS_OPERATION_TIMEOUT_MS` - Command timeout (default: 500)
    /// - `REDIS_RECONNECT_INTERVAL_SECS` - Reconnect back-off (default: 5)
    /// - `CACHE_MAX_ENTRIES` - Entries per in-memory tier (default: 1000)
    /// - `CACHE_{SHORT,MEDIUM,LONG}_TTL` - Tier TTLs (default: 300/1800/7200)
    /// - `CACHE_{SHORT,MEDIUM,LONG}_CHECK` - Sweep intervals (default: 60/300/600)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let redis = env::var("REDIS_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(|url| {
                let base = RedisConfig::new(url.trim());
                RedisConfig {
                    prefix: env::var("REDIS_PREFIX").unwrap_or(base.prefix),
                    connect_timeout: Duration::from_millis(env_or(
                        "REDIS_CONNECT_TIMEOUT_MS",
                        base.connect_timeout.as_millis() as u64,
                    )),
                    operation_timeout: Duration::from_millis(env_or(
                        "REDIS_OPERATION_TIMEOUT_MS",
                        base.operation_timeout.as_millis() as u64,
                    )),
                    reconnect_interval: Duration::from_secs(env_or(
                        "REDIS_RECONNECT_INTERVAL_SECS",
                        base.reconnect_interval.as_secs(),
                    )),
                    url: base.url,
                }
            });

        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            redis,
            max_entries: env_or("CACHE_MAX_ENTRIES", defaults.max_entries),
            short: tier_from_env("SHORT", defaults.short),
            medium: tier_from_env("MEDIUM", defaults.medium),
            long: tier_from_env("LONG", defaults.long),
        }
    }

    /// Returns the configuration of a single tier.
    pub fn tier(&self, tier: CacheTier) -> TierConfig {
        match tier {
            CacheTier::Short => self.short,
            CacheTier::Medium => self.medium,
            CacheTier::Long => self.long,
        }
    }

    /// Rejects settings the cache cannot be built with.
    ///
    /// Called once at startup so misconfiguration fails the process, not requests.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(CacheError::Config("CACHE_MAX_ENTRIES must be > 0".into()));
        }
        for tier in CacheTier::ALL {
            let cfg = self.tier(tier);
            if cfg.default_ttl == 0 {
                return Err(CacheError::Config(format!(
                    "{} tier TTL must be > 0",
                    tier.name()
                )));
            }
            if cfg.check_interval == 0 {
                return Err(CacheError::Config(format!(
                    "{} tier check interval must be > 0",
                    tier.name()
                )));
            }
        }
        if let Some(redis) = &self.redis {
            if redis.operation_timeout.is_zero() || redis.connect_timeout.is_zero() {
                return Err(CacheError::Config("Redis timeouts must be > 0".into()));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            redis: None,
            max_entries: 1000,
            short: CacheTier::Short.default_config(),
            medium: CacheTier::Medium.default_config(),
            long: CacheTier::Long.default_config(),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn tier_from_env(tier: &str, default: TierConfig) -> TierConfig {
    TierConfig {
        default_ttl: env_or(&format!("CACHE_{tier}_TTL"), default.default_ttl),
        check_interval: env_or(&format!("CACHE_{tier}_CHECK"), default.check_interval),
    }
}
