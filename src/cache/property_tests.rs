//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache against a plain HashMap model and to
//! verify the expiration index and LRU invariants.

use proptest::prelude::*;
use std::collections::HashMap;

use crate::cache::{
    bucket_of, current_timestamp_ms, CacheAdapter, MemoryCache, Ttl, BUCKET_MS, NEVER_EXPIRE,
};

// == Strategies ==
/// Small key space so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e]{1,2}"
}

fn value_strategy() -> impl Strategy<Value = u32> {
    any::<u32>()
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: u32 },
    SetIfNotExist { key: String, value: u32 },
    Get { key: String },
    Update { key: String, value: u32 },
    Remove { keys: Vec<String> },
    Maintain,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::SetIfNotExist { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Update { key, value }),
        prop::collection::vec(key_strategy(), 1..4).prop_map(|keys| CacheOp::Remove { keys }),
        Just(CacheOp::Maintain),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any sequence of operations on an unbounded cache with non-expiring
    // entries, every read agrees with a HashMap fed the same operations.
    #[test]
    fn prop_matches_hashmap_model(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let cache = MemoryCache::new(0);
        let mut model: HashMap<String, u32> = HashMap::new();

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    cache.set(key.clone(), value, Ttl::Never);
                    model.insert(key, value);
                }
                CacheOp::SetIfNotExist { key, value } => {
                    let written = cache.set_if_not_exist(key.clone(), value, Ttl::Never);
                    prop_assert_eq!(written, !model.contains_key(&key));
                    model.entry(key).or_insert(value);
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(cache.get(&key), model.get(&key).copied());
                }
                CacheOp::Update { key, value } => {
                    let old = cache.update(&key, value);
                    let expected = model.get_mut(&key).map(|slot| std::mem::replace(slot, value));
                    prop_assert_eq!(old, expected);
                }
                CacheOp::Remove { keys } => {
                    let last = cache.remove(&keys);
                    let expected = keys.iter().filter_map(|key| model.remove(key)).last();
                    prop_assert_eq!(last, expected);
                }
                CacheOp::Maintain => {
                    prop_assert!(cache.run_maintenance().is_continue());
                }
            }
        }

        prop_assert_eq!(cache.size(), model.len());
        prop_assert_eq!(cache.data(), model);
    }

    // Storing V1 then V2 under the same key always reads back V2.
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        v1 in value_strategy(),
        v2 in value_strategy(),
    ) {
        let cache = MemoryCache::new(0);

        cache.set(key.clone(), v1, Ttl::Never);
        cache.set(key.clone(), v2, Ttl::Never);

        prop_assert_eq!(cache.get(&key), Some(v2));
        prop_assert_eq!(cache.size(), 1);
    }

    // After one maintenance cycle a bounded cache holds at most `capacity`
    // keys, and they are the most recently written distinct keys.
    #[test]
    fn prop_lru_keeps_most_recent_keys(
        keys in prop::collection::vec(0u16..50, 1..120),
        capacity in 1usize..10,
    ) {
        let cache = MemoryCache::new(capacity);
        for key in &keys {
            cache.set(*key, u32::from(*key), Ttl::Never);
        }

        prop_assert!(cache.run_maintenance().is_continue());

        let mut expected: Vec<u16> = Vec::new();
        for key in keys.iter().rev() {
            if expected.len() == capacity {
                break;
            }
            if !expected.contains(key) {
                expected.push(*key);
            }
        }
        expected.sort_unstable();
        let mut retained = cache.keys();
        retained.sort_unstable();

        prop_assert!(cache.size() <= capacity);
        prop_assert_eq!(retained, expected);
    }

    // Within one cycle, reads rank ahead of writes: the survivors are the
    // most recent distinct keys of the writes followed by the hit reads.
    #[test]
    fn prop_lru_reads_rank_ahead_of_writes(
        ops in prop::collection::vec((any::<bool>(), 0u16..30), 1..120),
        capacity in 1usize..8,
    ) {
        let cache = MemoryCache::new(capacity);
        let mut written: Vec<u16> = Vec::new();
        let mut hits: Vec<u16> = Vec::new();
        for (is_read, key) in ops {
            if is_read {
                let found = cache.get(&key).is_some();
                prop_assert_eq!(found, written.contains(&key));
                if found {
                    hits.push(key);
                }
            } else {
                cache.set(key, u32::from(key), Ttl::Never);
                written.push(key);
            }
        }

        prop_assert!(cache.run_maintenance().is_continue());

        let mut expected: Vec<u16> = Vec::new();
        for key in written.iter().chain(hits.iter()).rev() {
            if expected.len() == capacity {
                break;
            }
            if !expected.contains(key) {
                expected.push(*key);
            }
        }
        expected.sort_unstable();
        let mut retained = cache.keys();
        retained.sort_unstable();

        prop_assert_eq!(retained, expected);
    }

    // Buckets are whole seconds strictly after the stamp and at most one
    // bucket away from it.
    #[test]
    fn prop_bucket_bounds(stamp in 0i64..4_000_000_000_000) {
        let bucket = bucket_of(stamp);

        prop_assert_eq!(bucket % BUCKET_MS, 0);
        prop_assert!(bucket > stamp);
        prop_assert!(bucket - stamp <= BUCKET_MS);
    }

    // After a cycle, every key with a finite TTL is filed under exactly the
    // bucket of its stored expiration, and never-expiring keys are untracked.
    #[test]
    fn prop_index_agrees_with_store(
        writes in prop::collection::vec((key_strategy(), 0u64..120), 1..40),
    ) {
        let cache = MemoryCache::new(0);
        for (key, ttl_secs) in &writes {
            // 0 means never expires
            cache.set(key.clone(), 0u32, Ttl::secs(*ttl_secs));
        }

        prop_assert!(cache.run_maintenance().is_continue());

        for (key, _) in &writes {
            let entry = cache.store.get(key).expect("entry should be stored");
            let bucket = cache.index.bucket_for_key(key);
            if entry.expire_at == NEVER_EXPIRE {
                prop_assert_eq!(bucket, 0);
            } else {
                prop_assert!(entry.expire_at > current_timestamp_ms());
                prop_assert_eq!(bucket, bucket_of(entry.expire_at));
                prop_assert!(cache.index.bucket_contains(bucket, key));
            }
        }
    }
}
