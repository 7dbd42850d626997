//! Expiration Index Module
//!
//! Groups keys by second-aligned expiration buckets so the sweep only has to
//! look at a handful of buckets per cycle instead of scanning every entry.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use parking_lot::RwLock;

use crate::cache::entry::NEVER_EXPIRE;

/// Width of one expiration bucket in milliseconds.
pub const BUCKET_MS: i64 = 1_000;

/// Number of elapsed buckets inspected by each sweep.
pub const SWEEP_BUCKETS: i64 = 5;

// == Quantize ==
/// Rounds an expiration stamp up to its bucket boundary.
///
/// Buckets are shifted one second ahead, so a bucket is only swept once every
/// stamp it holds has passed. Stamps too close to `i64::MAX` to have a bucket
/// map to `i64::MAX`, which is never swept.
pub fn bucket_of(expire_at: i64) -> i64 {
    (expire_at.div_euclid(BUCKET_MS) + 1).saturating_mul(BUCKET_MS)
}

// == Expiration Index ==
/// Two coupled maps: key to bucket, and bucket to the keys it holds.
///
/// Only the maintenance routine writes to the index; each map has its own lock.
#[derive(Debug)]
pub struct ExpirationIndex<K> {
    key_buckets: RwLock<HashMap<K, i64>>,
    bucket_keys: RwLock<HashMap<i64, HashSet<K>>>,
}

impl<K> Default for ExpirationIndex<K> {
    fn default() -> Self {
        Self {
            key_buckets: RwLock::new(HashMap::new()),
            bucket_keys: RwLock::new(HashMap::new()),
        }
    }
}

impl<K> ExpirationIndex<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket the key is filed under, or 0 when untracked.
    pub fn bucket_for_key(&self, key: &K) -> i64 {
        self.key_buckets.read().get(key).copied().unwrap_or(0)
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.key_buckets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of non-empty buckets.
    pub fn bucket_count(&self) -> usize {
        self.bucket_keys.read().len()
    }

    /// Returns true if the bucket holds the key.
    pub fn bucket_contains(&self, bucket: i64, key: &K) -> bool {
        self.bucket_keys
            .read()
            .get(&bucket)
            .is_some_and(|keys| keys.contains(key))
    }

    // == Reconcile ==
    /// Files the key under the bucket of its new expiration stamp.
    ///
    /// Buckets older than `floor` are moved forward to `floor` so they are
    /// still inside the sweep window. A never-expiring stamp untracks the key.
    /// Nothing changes when the key stays in the same bucket.
    pub fn reconcile(&self, key: &K, expire_at: i64, floor: i64) {
        if expire_at == NEVER_EXPIRE {
            self.forget(key);
            return;
        }
        let new_bucket = bucket_of(expire_at).max(floor);
        let old_bucket = self.bucket_for_key(key);
        if new_bucket == old_bucket {
            return;
        }

        {
            let mut buckets = self.bucket_keys.write();
            buckets.entry(new_bucket).or_default().insert(key.clone());
            if old_bucket != 0 {
                remove_from_bucket(&mut buckets, old_bucket, key);
            }
        }
        self.key_buckets.write().insert(key.clone(), new_bucket);
    }

    // == Forget ==
    /// Untracks the key entirely.
    pub fn forget(&self, key: &K) {
        let old_bucket = self.key_buckets.write().remove(key);
        if let Some(bucket) = old_bucket {
            remove_from_bucket(&mut self.bucket_keys.write(), bucket, key);
        }
    }

    // == Take Bucket ==
    /// Detaches and returns the keys held by a bucket.
    pub fn take_bucket(&self, bucket: i64) -> Option<HashSet<K>> {
        self.bucket_keys.write().remove(&bucket)
    }

    // == Clear ==
    pub fn clear(&self) {
        self.key_buckets.write().clear();
        self.bucket_keys.write().clear();
    }
}

fn remove_from_bucket<K: Eq + Hash>(buckets: &mut HashMap<i64, HashSet<K>>, bucket: i64, key: &K) {
    if let Some(keys) = buckets.get_mut(&bucket) {
        keys.remove(key);
        if keys.is_empty() {
            buckets.remove(&bucket);
        }
    }
}
