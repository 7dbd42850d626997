//! Mini Cache - an in-process key-value cache
//!
//! Provides per-key TTL expiration and optional LRU eviction, with the
//! bookkeeping for both moved off the read/write path into a periodic
//! maintenance routine.

pub mod cache;
pub mod config;
pub mod error;
pub mod global;
pub mod tasks;

pub use cache::{Cache, CacheAdapter, Expiry, MemoryCache, Ttl};
pub use config::Config;
pub use error::{CacheError, Result};
pub use global::default_cache;
pub use tasks::{spawn_maintenance_task, spawn_maintenance_thread, Maintain};
