//! Memory Cache Module
//!
//! The in-process cache backend. Reads and writes go straight to the entry
//! store and append to event logs; the maintenance routine later replays those
//! logs into the expiration index and the LRU tracker, evicts over-capacity
//! keys and sweeps elapsed expiration buckets.

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::ControlFlow;
use std::slice;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::cache::adapter::CacheAdapter;
use crate::cache::entry::{current_timestamp_ms, CacheEntry, Expiry, Ttl};
use crate::cache::events::{EventLog, PendingEvent};
use crate::cache::expiry::{bucket_of, ExpirationIndex, BUCKET_MS, SWEEP_BUCKETS};
use crate::cache::lru::LruTracker;
use crate::cache::stats::{CacheStats, StatsRecorder};
use crate::cache::store::{EntryStore, SwapOutcome};
use crate::tasks::Maintain;

// == Cycle Report ==
/// Work done by one maintenance cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Pending events replayed into the expiration index
    pub synced: usize,
    /// Keys evicted by the LRU policy
    pub evicted: usize,
    /// Expired entries deleted by the bucket sweep
    pub expired: usize,
}

impl CycleReport {
    pub fn is_idle(&self) -> bool {
        self.synced == 0 && self.evicted == 0 && self.expired == 0
    }
}

// == Memory Cache ==
/// In-memory cache with per-key TTL and optional LRU capacity bound.
pub struct MemoryCache<K, V> {
    pub(super) store: EntryStore<K, V>,
    pub(super) index: ExpirationIndex<K>,
    events: EventLog<PendingEvent<K>>,
    /// Present only when a positive capacity was configured
    lru: Option<LruTracker<K>>,
    stats: StatsRecorder,
    /// Newest bucket already swept; also serializes maintenance cycles
    swept_until: Mutex<i64>,
    cleared: AtomicBool,
    closed: AtomicBool,
}

impl<K, V> MemoryCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache. A `capacity` of 0 disables LRU eviction.
    pub fn new(capacity: usize) -> Self {
        let lru = (capacity > 0).then(|| LruTracker::new(capacity));
        Self {
            store: EntryStore::new(),
            index: ExpirationIndex::new(),
            events: EventLog::new(),
            lru,
            stats: StatsRecorder::new(),
            swept_until: Mutex::new(bucket_of(current_timestamp_ms()) - BUCKET_MS),
            cleared: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Configured LRU capacity, 0 when unbounded.
    pub fn capacity(&self) -> usize {
        self.lru.as_ref().map_or(0, LruTracker::capacity)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Current counters and live entry count.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.store.len())
    }

    // == Maintenance ==
    /// Runs one maintenance cycle.
    ///
    /// Returns `Break` once the cache is closed so the scheduler stops calling
    /// it. A call that overlaps a running cycle does nothing.
    pub fn run_maintenance(&self) -> ControlFlow<(), CycleReport> {
        if self.is_closed() {
            return ControlFlow::Break(());
        }
        let Some(mut swept_until) = self.swept_until.try_lock() else {
            return ControlFlow::Continue(CycleReport::default());
        };

        let now = current_timestamp_ms();
        let now_bucket = bucket_of(now);
        let newest = now_bucket - BUCKET_MS;
        // Widen the window back to the last swept bucket after a stall.
        let oldest = (now_bucket - SWEEP_BUCKETS * BUCKET_MS).min(*swept_until + BUCKET_MS);

        if self.cleared.swap(false, Ordering::AcqRel) {
            self.index.clear();
            if let Some(lru) = &self.lru {
                lru.clear();
            }
        }

        let report = CycleReport {
            synced: self.sync_events(now, oldest),
            evicted: self.evict(),
            expired: self.sweep(oldest, newest),
        };
        *swept_until = (*swept_until).max(newest);

        if !report.is_idle() {
            debug!(
                synced = report.synced,
                evicted = report.evicted,
                expired = report.expired,
                "Cache maintenance cycle"
            );
        }
        ControlFlow::Continue(report)
    }

    /// Replays pending events into the expiration index and the LRU log.
    fn sync_events(&self, now: i64, floor: i64) -> usize {
        let mut synced = 0;
        for event in self.events.drain() {
            self.index.reconcile(&event.key, event.expire_at, floor);
            if let Some(lru) = &self.lru {
                if event.expire_at > now {
                    lru.push(event.key);
                } else {
                    lru.remove(&event.key);
                }
            }
            synced += 1;
        }
        synced
    }

    /// Promotes recently used keys and evicts the least recently used ones.
    fn evict(&self) -> usize {
        let Some(lru) = &self.lru else {
            return 0;
        };
        let evicted = lru.sync_and_evict(|key| self.store.contains(key));
        let mut deleted = 0;
        for key in &evicted {
            if self.store.delete_if_expired(key, true) {
                deleted += 1;
            }
            self.index.forget(key);
        }
        self.stats.record_evictions(deleted as u64);
        deleted
    }

    /// Deletes expired entries filed under the buckets in `[oldest, newest]`.
    ///
    /// An entry rewritten with a fresh TTL whose event is still pending is
    /// left in place: only entries that are expired right now are deleted.
    fn sweep(&self, oldest: i64, newest: i64) -> usize {
        let mut expired = 0;
        let mut bucket = oldest;
        while bucket <= newest {
            if let Some(keys) = self.index.take_bucket(bucket) {
                for key in keys {
                    if self.store.delete_if_expired(&key, false) {
                        expired += 1;
                    }
                    self.index.forget(&key);
                    if let Some(lru) = &self.lru {
                        lru.remove(&key);
                    }
                }
            }
            bucket += BUCKET_MS;
        }
        self.stats.record_expirations(expired as u64);
        expired
    }

    fn record(&self, key: K, expire_at: i64) {
        self.events.push(PendingEvent::new(key, expire_at));
    }

    /// Atomic absence check and write; records an event when written.
    fn set_with_lock_check<F, E>(&self, key: K, f: F, ttl: Ttl) -> Result<SwapOutcome<V>, E>
    where
        F: FnOnce() -> Result<Option<V>, E>,
    {
        let expire_at = ttl.expire_at(current_timestamp_ms());
        let outcome = self.store.set_if_absent_with(key.clone(), f, expire_at)?;
        if outcome.is_written() {
            self.record(key, expire_at);
        }
        Ok(outcome)
    }

    fn set_if_absent(&self, key: K, value: V, ttl: Ttl) -> (V, bool) {
        let expire_at = ttl.expire_at(current_timestamp_ms());
        let (value, written) = self.store.set_if_absent(key.clone(), value, expire_at);
        if written {
            self.record(key, expire_at);
        }
        (value, written)
    }
}

impl<K, V> Maintain for MemoryCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn maintain(&self) -> ControlFlow<()> {
        match self.run_maintenance() {
            ControlFlow::Continue(_) => ControlFlow::Continue(()),
            ControlFlow::Break(()) => ControlFlow::Break(()),
        }
    }
}

impl<K, V> CacheAdapter<K, V> for MemoryCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn set(&self, key: K, value: V, ttl: Ttl) {
        let expire_at = ttl.expire_at(current_timestamp_ms());
        if ttl.is_expired() {
            self.store.remove(slice::from_ref(&key));
        } else {
            self.store.put(key.clone(), CacheEntry::new(value, expire_at));
        }
        self.record(key, expire_at);
    }

    fn set_map(&self, data: HashMap<K, V>, ttl: Ttl) {
        let expire_at = ttl.expire_at(current_timestamp_ms());
        let keys: Vec<K> = data.keys().cloned().collect();
        if ttl.is_expired() {
            self.store.remove(&keys);
        } else {
            self.store.put_all(data, expire_at);
        }
        for key in keys {
            self.record(key, expire_at);
        }
    }

    fn set_if_not_exist(&self, key: K, value: V, ttl: Ttl) -> bool {
        self.set_if_absent(key, value, ttl).1
    }

    fn set_if_not_exist_func<F, E>(&self, key: K, f: F, ttl: Ttl) -> Result<bool, E>
    where
        F: FnOnce() -> Result<Option<V>, E>,
    {
        if self.contains(&key) {
            return Ok(false);
        }
        match f()? {
            Some(value) => Ok(self.set_if_absent(key, value, ttl).1),
            None => Ok(false),
        }
    }

    fn set_if_not_exist_func_lock<F, E>(&self, key: K, f: F, ttl: Ttl) -> Result<bool, E>
    where
        F: FnOnce() -> Result<Option<V>, E>,
    {
        Ok(self.set_with_lock_check(key, f, ttl)?.is_written())
    }

    fn get(&self, key: &K) -> Option<V> {
        match self.store.get_live(key) {
            Some(value) => {
                self.stats.record_hit();
                if let Some(lru) = &self.lru {
                    lru.push_read(key.clone());
                }
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    fn get_or_set(&self, key: K, value: V, ttl: Ttl) -> V {
        if let Some(existing) = self.get(&key) {
            return existing;
        }
        self.set_if_absent(key, value, ttl).0
    }

    fn get_or_set_func<F, E>(&self, key: K, f: F, ttl: Ttl) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Result<Option<V>, E>,
    {
        if let Some(existing) = self.get(&key) {
            return Ok(Some(existing));
        }
        match f()? {
            Some(value) => Ok(Some(self.set_if_absent(key, value, ttl).0)),
            None => Ok(None),
        }
    }

    fn get_or_set_func_lock<F, E>(&self, key: K, f: F, ttl: Ttl) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Result<Option<V>, E>,
    {
        if let Some(existing) = self.get(&key) {
            return Ok(Some(existing));
        }
        Ok(self.set_with_lock_check(key, f, ttl)?.into_value())
    }

    fn contains(&self, key: &K) -> bool {
        self.store.contains(key)
    }

    fn get_expire(&self, key: &K) -> Option<Expiry> {
        self.store.expiry(key)
    }

    fn update(&self, key: &K, value: V) -> Option<V> {
        let (old, expire_at) = self.store.update_value(key, value)?;
        self.record(key.clone(), expire_at);
        Some(old)
    }

    fn update_expire(&self, key: &K, ttl: Ttl) -> Option<Expiry> {
        if ttl.is_expired() {
            let previous = self.store.remove_live(key)?;
            self.record(key.clone(), ttl.expire_at(current_timestamp_ms()));
            return Some(previous);
        }
        let expire_at = ttl.expire_at(current_timestamp_ms());
        let previous = self.store.update_expire(key, expire_at)?;
        self.record(key.clone(), expire_at);
        Some(previous)
    }

    fn remove(&self, keys: &[K]) -> Option<V> {
        let (removed, last) = self.store.remove(keys);
        let expire_at = Ttl::Expired.expire_at(current_timestamp_ms());
        for key in removed {
            self.record(key, expire_at);
        }
        last
    }

    fn size(&self) -> usize {
        self.store.len()
    }

    fn data(&self) -> HashMap<K, V> {
        self.store.data()
    }

    fn keys(&self) -> Vec<K> {
        self.store.keys()
    }

    fn values(&self) -> Vec<V> {
        self.store.values()
    }

    fn clear(&self) {
        self.store.clear();
        self.cleared.store(true, Ordering::Release);
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("Cache closed, maintenance will stop");
        }
    }
}
