//! Process-wide default cache.
//!
//! Built on first access from the environment configuration, with its own
//! maintenance thread. Values are JSON so unrelated callers can share it.

use std::sync::OnceLock;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::cache::Cache;
use crate::config::Config;
use crate::tasks::spawn_maintenance_thread;

static DEFAULT_CACHE: OnceLock<Cache<String, Value>> = OnceLock::new();

/// Returns the shared default cache, creating it on first use.
pub fn default_cache() -> &'static Cache<String, Value> {
    DEFAULT_CACHE.get_or_init(|| {
        let config = Config::from_env().unwrap_or_else(|err| {
            warn!("{}, using default cache configuration", err);
            Config::default()
        });

        let cache = Cache::new(config.capacity);
        if let Err(err) = spawn_maintenance_thread(cache.clone(), config.maintenance_interval()) {
            error!("Default cache runs without maintenance: {}", err);
        }

        info!(
            "Default cache initialized: capacity={}, maintenance_interval={}ms",
            config.capacity, config.maintenance_interval_ms
        );
        cache
    })
}
