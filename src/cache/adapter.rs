//! Cache Adapter Module
//!
//! The backend contract the [`Cache`](crate::cache::Cache) facade is written
//! against. [`MemoryCache`](crate::cache::MemoryCache) is the in-process
//! implementation; other backends implement the same trait.

use std::collections::HashMap;

use crate::cache::entry::{Expiry, Ttl};

/// Operations every cache backend provides.
///
/// All methods are safe to call from any number of threads at once.
/// Absence is reported through `Option`/`bool`, never as an error. The only
/// errors are those produced by caller-supplied callbacks, which are returned
/// unchanged and leave the cache untouched.
pub trait CacheAdapter<K, V>: Send + Sync {
    /// Stores the value. `Ttl::Never` never expires, `Ttl::Expired` deletes the key.
    fn set(&self, key: K, value: V, ttl: Ttl);

    /// Stores every pair with the same TTL.
    fn set_map(&self, data: HashMap<K, V>, ttl: Ttl);

    /// Stores the value only if the key has no live entry.
    ///
    /// Returns true if the value was written.
    fn set_if_not_exist(&self, key: K, value: V, ttl: Ttl) -> bool;

    /// Calls `f` only when the key has no live entry and stores its result.
    ///
    /// The absence check and the write are separate steps, so concurrent
    /// callers may both run `f`; only one of them writes.
    fn set_if_not_exist_func<F, E>(&self, key: K, f: F, ttl: Ttl) -> Result<bool, E>
    where
        F: FnOnce() -> Result<Option<V>, E>;

    /// Like [`set_if_not_exist_func`](Self::set_if_not_exist_func), but `f` runs
    /// inside the store's exclusive section, so at most one caller runs it.
    fn set_if_not_exist_func_lock<F, E>(&self, key: K, f: F, ttl: Ttl) -> Result<bool, E>
    where
        F: FnOnce() -> Result<Option<V>, E>;

    /// Returns the value of a live entry.
    fn get(&self, key: &K) -> Option<V>;

    /// Returns the live value, or stores and returns `value` if there is none.
    fn get_or_set(&self, key: K, value: V, ttl: Ttl) -> V;

    /// Returns the live value, or computes, stores and returns one.
    ///
    /// `Ok(None)` from `f` stores nothing and yields `Ok(None)`.
    fn get_or_set_func<F, E>(&self, key: K, f: F, ttl: Ttl) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Result<Option<V>, E>;

    /// Like [`get_or_set_func`](Self::get_or_set_func), with `f` run inside the
    /// store's exclusive section.
    fn get_or_set_func_lock<F, E>(&self, key: K, f: F, ttl: Ttl) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Result<Option<V>, E>;

    /// Returns true if the key has a live entry.
    fn contains(&self, key: &K) -> bool;

    /// Remaining lifetime of the key, or None if it has no live entry.
    fn get_expire(&self, key: &K) -> Option<Expiry>;

    /// Replaces the value of a live entry, keeping its TTL.
    ///
    /// Returns the old value, or None (and writes nothing) if the key is absent.
    fn update(&self, key: &K, value: V) -> Option<V>;

    /// Replaces the TTL of a live entry, keeping its value.
    ///
    /// `Ttl::Expired` deletes the key. Returns the lifetime the entry had left,
    /// or None if the key is absent.
    fn update_expire(&self, key: &K, ttl: Ttl) -> Option<Expiry>;

    /// Deletes the keys and returns the value of the last one removed.
    fn remove(&self, keys: &[K]) -> Option<V>;

    /// Number of live entries.
    fn size(&self) -> usize;

    /// Copy of all live key-value pairs.
    fn data(&self) -> HashMap<K, V>;

    /// Copies of all live keys.
    fn keys(&self) -> Vec<K>;

    /// Copies of all live values.
    fn values(&self) -> Vec<V>;

    /// Drops every entry.
    fn clear(&self);

    /// Stops background maintenance. Entries stay readable.
    fn close(&self);
}
