//! Cache Facade Module
//!
//! The public cache handle. It forwards every operation to a backend
//! implementing [`CacheAdapter`] and adds the panicking `must_*` shortcuts on
//! top of the fallible compute-on-miss operations.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::ops::ControlFlow;
use std::sync::Arc;

use crate::cache::adapter::CacheAdapter;
use crate::cache::entry::{Expiry, Ttl};
use crate::cache::memory::MemoryCache;
use crate::cache::stats::CacheStats;
use crate::tasks::Maintain;

// == Cache ==
/// Shared cache handle. Cloning is cheap and every clone sees the same data.
pub struct Cache<K, V, A = MemoryCache<K, V>> {
    adapter: Arc<A>,
    _marker: PhantomData<fn(K) -> V>,
}

impl<K, V, A> Clone for Cache<K, V, A> {
    fn clone(&self) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
            _marker: PhantomData,
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates an in-memory cache. A `capacity` of 0 disables LRU eviction.
    ///
    /// Maintenance is not scheduled here; hand a clone to
    /// [`spawn_maintenance_task`](crate::tasks::spawn_maintenance_task) or
    /// [`spawn_maintenance_thread`](crate::tasks::spawn_maintenance_thread).
    pub fn new(capacity: usize) -> Self {
        Self::with_adapter(MemoryCache::new(capacity))
    }

    /// Current counters of the in-memory backend.
    pub fn stats(&self) -> CacheStats {
        self.adapter.stats()
    }
}

impl<K, V, A> Cache<K, V, A>
where
    A: CacheAdapter<K, V>,
{
    /// Wraps an arbitrary backend.
    pub fn with_adapter(adapter: A) -> Self {
        Self {
            adapter: Arc::new(adapter),
            _marker: PhantomData,
        }
    }

    /// The backend behind this handle.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    // == Writes ==
    pub fn set(&self, key: K, value: V, ttl: impl Into<Ttl>) {
        self.adapter.set(key, value, ttl.into())
    }

    pub fn set_map(&self, data: HashMap<K, V>, ttl: impl Into<Ttl>) {
        self.adapter.set_map(data, ttl.into())
    }

    pub fn set_if_not_exist(&self, key: K, value: V, ttl: impl Into<Ttl>) -> bool {
        self.adapter.set_if_not_exist(key, value, ttl.into())
    }

    pub fn set_if_not_exist_func<F, E>(&self, key: K, f: F, ttl: impl Into<Ttl>) -> Result<bool, E>
    where
        F: FnOnce() -> Result<Option<V>, E>,
    {
        self.adapter.set_if_not_exist_func(key, f, ttl.into())
    }

    pub fn set_if_not_exist_func_lock<F, E>(
        &self,
        key: K,
        f: F,
        ttl: impl Into<Ttl>,
    ) -> Result<bool, E>
    where
        F: FnOnce() -> Result<Option<V>, E>,
    {
        self.adapter.set_if_not_exist_func_lock(key, f, ttl.into())
    }

    pub fn update(&self, key: &K, value: V) -> Option<V> {
        self.adapter.update(key, value)
    }

    pub fn update_expire(&self, key: &K, ttl: impl Into<Ttl>) -> Option<Expiry> {
        self.adapter.update_expire(key, ttl.into())
    }

    pub fn remove(&self, keys: &[K]) -> Option<V> {
        self.adapter.remove(keys)
    }

    pub fn clear(&self) {
        self.adapter.clear()
    }

    pub fn close(&self) {
        self.adapter.close()
    }

    // == Reads ==
    pub fn get(&self, key: &K) -> Option<V> {
        self.adapter.get(key)
    }

    pub fn get_or_set(&self, key: K, value: V, ttl: impl Into<Ttl>) -> V {
        self.adapter.get_or_set(key, value, ttl.into())
    }

    pub fn get_or_set_func<F, E>(&self, key: K, f: F, ttl: impl Into<Ttl>) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Result<Option<V>, E>,
    {
        self.adapter.get_or_set_func(key, f, ttl.into())
    }

    pub fn get_or_set_func_lock<F, E>(
        &self,
        key: K,
        f: F,
        ttl: impl Into<Ttl>,
    ) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Result<Option<V>, E>,
    {
        self.adapter.get_or_set_func_lock(key, f, ttl.into())
    }

    pub fn contains(&self, key: &K) -> bool {
        self.adapter.contains(key)
    }

    pub fn get_expire(&self, key: &K) -> Option<Expiry> {
        self.adapter.get_expire(key)
    }

    pub fn size(&self) -> usize {
        self.adapter.size()
    }

    pub fn data(&self) -> HashMap<K, V> {
        self.adapter.data()
    }

    pub fn keys(&self) -> Vec<K> {
        self.adapter.keys()
    }

    pub fn values(&self) -> Vec<V> {
        self.adapter.values()
    }

    // == Must Variants ==
    /// [`set_if_not_exist_func`](Self::set_if_not_exist_func), panicking on callback error.
    pub fn must_set_if_not_exist_func<F, E>(&self, key: K, f: F, ttl: impl Into<Ttl>) -> bool
    where
        F: FnOnce() -> Result<Option<V>, E>,
        E: Debug,
    {
        match self.set_if_not_exist_func(key, f, ttl) {
            Ok(written) => written,
            Err(err) => panic!("set_if_not_exist_func callback failed: {err:?}"),
        }
    }

    /// [`set_if_not_exist_func_lock`](Self::set_if_not_exist_func_lock), panicking on callback error.
    pub fn must_set_if_not_exist_func_lock<F, E>(&self, key: K, f: F, ttl: impl Into<Ttl>) -> bool
    where
        F: FnOnce() -> Result<Option<V>, E>,
        E: Debug,
    {
        match self.set_if_not_exist_func_lock(key, f, ttl) {
            Ok(written) => written,
            Err(err) => panic!("set_if_not_exist_func_lock callback failed: {err:?}"),
        }
    }

    /// [`get_or_set_func`](Self::get_or_set_func), panicking on callback error.
    pub fn must_get_or_set_func<F, E>(&self, key: K, f: F, ttl: impl Into<Ttl>) -> Option<V>
    where
        F: FnOnce() -> Result<Option<V>, E>,
        E: Debug,
    {
        match self.get_or_set_func(key, f, ttl) {
            Ok(value) => value,
            Err(err) => panic!("get_or_set_func callback failed: {err:?}"),
        }
    }

    /// [`get_or_set_func_lock`](Self::get_or_set_func_lock), panicking on callback error.
    pub fn must_get_or_set_func_lock<F, E>(&self, key: K, f: F, ttl: impl Into<Ttl>) -> Option<V>
    where
        F: FnOnce() -> Result<Option<V>, E>,
        E: Debug,
    {
        match self.get_or_set_func_lock(key, f, ttl) {
            Ok(value) => value,
            Err(err) => panic!("get_or_set_func_lock callback failed: {err:?}"),
        }
    }
}

impl<K, V, A> Maintain for Cache<K, V, A>
where
    K: 'static,
    V: 'static,
    A: CacheAdapter<K, V> + Maintain,
{
    fn maintain(&self) -> ControlFlow<()> {
        self.adapter.maintain()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_clone_shares_data() {
        let cache = Cache::new(0);
        let other = cache.clone();

        cache.set("a", 1, Ttl::Never);

        assert_eq!(other.get(&"a"), Some(1));
    }

    #[test]
    fn test_ttl_accepts_duration() {
        let cache = Cache::new(0);

        cache.set("forever", 1, Duration::ZERO);
        cache.set("minute", 2, Duration::from_secs(60));

        assert_eq!(cache.get_expire(&"forever"), Some(Expiry::Never));
        assert!(matches!(cache.get_expire(&"minute"), Some(Expiry::In(_))));
    }

    #[test]
    fn test_must_variants_pass_through() {
        let cache = Cache::new(0);

        let found = |value| move || Ok::<_, String>(Some(value));

        assert!(cache.must_set_if_not_exist_func("a", found(1), Ttl::Never));
        assert!(!cache.must_set_if_not_exist_func_lock("a", found(2), Ttl::Never));
        assert_eq!(cache.must_get_or_set_func("a", found(3), Ttl::Never), Some(1));
        assert_eq!(cache.must_get_or_set_func_lock("b", found(4), Ttl::Never), Some(4));
    }

    #[test]
    #[should_panic(expected = "get_or_set_func callback failed")]
    fn test_must_get_or_set_func_panics_on_error() {
        let cache: Cache<&str, i32> = Cache::new(0);
        cache.must_get_or_set_func("a", || Err("backend down"), Ttl::Never);
    }

    // A backend that only counts calls, to check the facade forwards as-is.
    #[derive(Default)]
    struct CountingAdapter {
        calls: AtomicUsize,
    }

    impl CountingAdapter {
        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl CacheAdapter<u32, u32> for CountingAdapter {
        fn set(&self, _: u32, _: u32, _: Ttl) {
            self.hit()
        }
        fn set_map(&self, _: HashMap<u32, u32>, _: Ttl) {
            self.hit()
        }
        fn set_if_not_exist(&self, _: u32, _: u32, _: Ttl) -> bool {
            self.hit();
            true
        }
        fn set_if_not_exist_func<F, E>(&self, _: u32, f: F, _: Ttl) -> Result<bool, E>
        where
            F: FnOnce() -> Result<Option<u32>, E>,
        {
            self.hit();
            f().map(|v| v.is_some())
        }
        fn set_if_not_exist_func_lock<F, E>(&self, key: u32, f: F, ttl: Ttl) -> Result<bool, E>
        where
            F: FnOnce() -> Result<Option<u32>, E>,
        {
            self.set_if_not_exist_func(key, f, ttl)
        }
        fn get(&self, key: &u32) -> Option<u32> {
            self.hit();
            Some(*key)
        }
        fn get_or_set(&self, _: u32, value: u32, _: Ttl) -> u32 {
            self.hit();
            value
        }
        fn get_or_set_func<F, E>(&self, _: u32, f: F, _: Ttl) -> Result<Option<u32>, E>
        where
            F: FnOnce() -> Result<Option<u32>, E>,
        {
            self.hit();
            f()
        }
        fn get_or_set_func_lock<F, E>(&self, key: u32, f: F, ttl: Ttl) -> Result<Option<u32>, E>
        where
            F: FnOnce() -> Result<Option<u32>, E>,
        {
            self.get_or_set_func(key, f, ttl)
        }
        fn contains(&self, _: &u32) -> bool {
            self.hit();
            false
        }
        fn get_expire(&self, _: &u32) -> Option<Expiry> {
            None
        }
        fn update(&self, _: &u32, _: u32) -> Option<u32> {
            None
        }
        fn update_expire(&self, _: &u32, _: Ttl) -> Option<Expiry> {
            None
        }
        fn remove(&self, _: &[u32]) -> Option<u32> {
            None
        }
        fn size(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
        fn data(&self) -> HashMap<u32, u32> {
            HashMap::new()
        }
        fn keys(&self) -> Vec<u32> {
            Vec::new()
        }
        fn values(&self) -> Vec<u32> {
            Vec::new()
        }
        fn clear(&self) {}
        fn close(&self) {}
    }

    #[test]
    fn test_facade_over_custom_adapter() {
        let cache = Cache::with_adapter(CountingAdapter::default());

        cache.set(1, 1, Ttl::Never);
        assert_eq!(cache.get(&7), Some(7));
        assert_eq!(cache.get_or_set_func(2, || Ok::<_, ()>(Some(5)), Ttl::Never), Ok(Some(5)));

        assert_eq!(cache.size(), 3);
        assert_eq!(cache.adapter().calls.load(Ordering::SeqCst), 3);
    }
}
