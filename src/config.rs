//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::Ttl;
use crate::error::{CacheError, Result};

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of entries kept by LRU eviction, 0 = unbounded
    pub capacity: usize,
    /// Interval between maintenance cycles in milliseconds
    pub maintenance_interval_ms: u64,
    /// Default TTL in signed milliseconds: 0 = never expires, negative = expired
    pub default_ttl_ms: i64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - LRU capacity, 0 disables eviction (default: 0)
    /// - `CACHE_MAINTENANCE_INTERVAL_MS` - Maintenance interval, > 0 (default: 1000)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 0)
    ///
    /// Unset variables fall back to their defaults; set but unusable values
    /// are reported as [`CacheError::InvalidConfig`].
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            capacity: read_var("CACHE_CAPACITY", defaults.capacity)?,
            maintenance_interval_ms: read_var(
                "CACHE_MAINTENANCE_INTERVAL_MS",
                defaults.maintenance_interval_ms,
            )?,
            default_ttl_ms: read_var("CACHE_DEFAULT_TTL_MS", defaults.default_ttl_ms)?,
        };

        if config.maintenance_interval_ms == 0 {
            return Err(CacheError::InvalidConfig {
                name: "CACHE_MAINTENANCE_INTERVAL_MS",
                value: "0".to_string(),
                reason: "interval must be greater than zero".to_string(),
            });
        }
        Ok(config)
    }

    /// Maintenance interval as a Duration.
    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_millis(self.maintenance_interval_ms)
    }

    /// Default TTL for writes that don't specify one.
    pub fn default_ttl(&self) -> Ttl {
        Ttl::from_millis(self.default_ttl_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 0,
            maintenance_interval_ms: 1000,
            default_ttl_ms: 0,
        }
    }
}

fn read_var<T>(name: &'static str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|err: T::Err| CacheError::InvalidConfig {
                name,
                value: value.clone(),
                reason: err.to_string(),
            }),
        Err(_) => Ok(default),
    }
}
