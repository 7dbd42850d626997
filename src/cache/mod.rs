//! Cache Module
//!
//! Provides in-memory caching with TTL expiration and LRU eviction.

mod adapter;
mod entry;
mod events;
mod expiry;
mod facade;
mod lru;
mod memory;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use adapter::CacheAdapter;
pub use entry::{current_timestamp_ms, CacheEntry, Expiry, Ttl, NEVER_EXPIRE};
pub use events::{EventLog, PendingEvent};
pub use expiry::{bucket_of, ExpirationIndex, BUCKET_MS, SWEEP_BUCKETS};
pub use facade::Cache;
pub use lru::{LruTracker, RecencyList};
pub use memory::{CycleReport, MemoryCache};
pub use stats::{CacheStats, StatsRecorder};
pub use store::{EntryStore, SwapOutcome};
