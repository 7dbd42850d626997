//! Entry Store Module
//!
//! Authoritative key to entry map behind a single read/write lock.
//!
//! Every read path re-checks expiration against the clock, so entries that
//! have expired but have not been swept yet are invisible to callers.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::RwLock;

use crate::cache::entry::{current_timestamp_ms, CacheEntry, Expiry};

// == Swap Outcome ==
/// Result of an atomic "set if absent" attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SwapOutcome<V> {
    /// A live entry already existed and was kept.
    Kept(V),
    /// The key was absent (or expired) and the value was written.
    Written(V),
    /// The key was absent but the producer yielded nothing to write.
    Skipped,
}

impl<V> SwapOutcome<V> {
    /// The value the key resolves to after the attempt, if any.
    pub fn into_value(self) -> Option<V> {
        match self {
            SwapOutcome::Kept(v) | SwapOutcome::Written(v) => Some(v),
            SwapOutcome::Skipped => None,
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, SwapOutcome::Written(_))
    }
}

// == Entry Store ==
/// Concurrency-safe map from key to `(value, expire_at)`.
#[derive(Debug)]
pub struct EntryStore<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> Default for EntryStore<K, V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> EntryStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Get ==
    /// Returns a copy of the stored entry, expired or not.
    pub fn get(&self, key: &K) -> Option<CacheEntry<V>> {
        self.entries.read().get(key).cloned()
    }

    /// Returns the value if the entry is present and live.
    pub fn get_live(&self, key: &K) -> Option<V> {
        let now = current_timestamp_ms();
        self.entries
            .read()
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.value.clone())
    }

    /// Returns true if the key has a live entry.
    pub fn contains(&self, key: &K) -> bool {
        let now = current_timestamp_ms();
        self.entries
            .read()
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    /// Returns the remaining lifetime of a live entry.
    pub fn expiry(&self, key: &K) -> Option<Expiry> {
        let now = current_timestamp_ms();
        self.entries
            .read()
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.expiry_at(now))
    }

    // == Put ==
    /// Stores an entry, replacing any previous one.
    pub fn put(&self, key: K, entry: CacheEntry<V>) {
        self.entries.write().insert(key, entry);
    }

    /// Stores every pair with the same expiration under one write lock.
    pub fn put_all<I>(&self, data: I, expire_at: i64)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut entries = self.entries.write();
        for (key, value) in data {
            entries.insert(key, CacheEntry::new(value, expire_at));
        }
    }

    // == Remove ==
    /// Removes the given keys.
    ///
    /// Returns the keys that were present and the value of the last live
    /// entry removed, in the order the keys were given.
    pub fn remove(&self, keys: &[K]) -> (Vec<K>, Option<V>) {
        let now = current_timestamp_ms();
        let mut entries = self.entries.write();
        let mut removed = Vec::with_capacity(keys.len());
        let mut last = None;
        for key in keys {
            if let Some(entry) = entries.remove(key) {
                removed.push(key.clone());
                if !entry.is_expired_at(now) {
                    last = Some(entry.value);
                }
            }
        }
        (removed, last)
    }

    /// Removes the key if its entry is live.
    ///
    /// Returns the lifetime the entry had left. Expired leftovers stay for the
    /// sweep and report None.
    pub fn remove_live(&self, key: &K) -> Option<Expiry> {
        let now = current_timestamp_ms();
        let mut entries = self.entries.write();
        let previous = entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.expiry_at(now))?;
        entries.remove(key);
        Some(previous)
    }

    // == Update ==
    /// Replaces the value of a live entry, keeping its expiration.
    ///
    /// Returns the old value, or None when the key is absent or expired.
    pub fn update_value(&self, key: &K, value: V) -> Option<(V, i64)> {
        let now = current_timestamp_ms();
        let mut entries = self.entries.write();
        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired_at(now) => {
                let expire_at = entry.expire_at;
                let old = std::mem::replace(entry, CacheEntry::new(value, expire_at));
                Some((old.value, expire_at))
            }
            _ => None,
        }
    }

    /// Replaces the expiration of a live entry, keeping its value.
    ///
    /// Returns the lifetime the entry had left before the change.
    pub fn update_expire(&self, key: &K, expire_at: i64) -> Option<Expiry> {
        let now = current_timestamp_ms();
        let mut entries = self.entries.write();
        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired_at(now) => {
                let previous = entry.expiry_at(now);
                *entry = CacheEntry::new(entry.value.clone(), expire_at);
                Some(previous)
            }
            _ => None,
        }
    }

    // == Compare And Swap Absent ==
    /// Writes the value only if the key is absent or expired.
    ///
    /// Returns the value the key resolves to and whether it was written.
    pub fn set_if_absent(&self, key: K, value: V, expire_at: i64) -> (V, bool) {
        let now = current_timestamp_ms();
        let mut entries = self.entries.write();
        if let Some(entry) = entries.get(&key) {
            if !entry.is_expired_at(now) {
                return (entry.value.clone(), false);
            }
        }
        entries.insert(key, CacheEntry::new(value.clone(), expire_at));
        (value, true)
    }

    /// Writes the produced value only if the key is absent or expired.
    ///
    /// The check and the write happen under one exclusive section, so among
    /// concurrent callers at most one producer runs and at most one write wins.
    /// A producer error aborts the write and is returned as-is.
    pub fn set_if_absent_with<F, E>(
        &self,
        key: K,
        produce: F,
        expire_at: i64,
    ) -> Result<SwapOutcome<V>, E>
    where
        F: FnOnce() -> Result<Option<V>, E>,
    {
        let now = current_timestamp_ms();
        let mut entries = self.entries.write();
        if let Some(entry) = entries.get(&key) {
            if !entry.is_expired_at(now) {
                return Ok(SwapOutcome::Kept(entry.value.clone()));
            }
        }
        match produce()? {
            Some(value) => {
                entries.insert(key, CacheEntry::new(value.clone(), expire_at));
                Ok(SwapOutcome::Written(value))
            }
            None => Ok(SwapOutcome::Skipped),
        }
    }

    // == Delete Expired ==
    /// Deletes the key if its entry is expired, or unconditionally when forced.
    ///
    /// Returns true if an entry was removed.
    pub fn delete_if_expired(&self, key: &K, force: bool) -> bool {
        let now = current_timestamp_ms();
        let mut entries = self.entries.write();
        let expired = match entries.get(key) {
            Some(entry) => force || entry.is_expired_at(now),
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        expired
    }

    // == Snapshots ==
    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = current_timestamp_ms();
        self.entries
            .read()
            .values()
            .filter(|entry| !entry.is_expired_at(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of stored entries, including expired ones not swept yet.
    pub fn raw_len(&self) -> usize {
        self.entries.read().len()
    }

    /// Copies of all live keys.
    pub fn keys(&self) -> Vec<K> {
        let now = current_timestamp_ms();
        self.entries
            .read()
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Copies of all live values.
    pub fn values(&self) -> Vec<V> {
        let now = current_timestamp_ms();
        self.entries
            .read()
            .values()
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.value.clone())
            .collect()
    }

    /// Copy of all live key-value pairs.
    pub fn data(&self) -> HashMap<K, V> {
        let now = current_timestamp_ms();
        self.entries
            .read()
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    // == Clear ==
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
