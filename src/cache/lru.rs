//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for capacity-bounded caches.
//!
//! Writes and reads only append the touched key to one of two raw logs. The
//! maintenance routine replays the write log, then the read log, into the
//! recency list and pops the least recently used keys once the list holds more
//! keys than the configured capacity.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::RwLock;

use crate::cache::events::EventLog;

// == Recency List ==
struct Node<K> {
    key: K,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Doubly linked list of keys over a slab of nodes.
///
/// Keys are ordered where:
/// - Front (head) = Most recently used
/// - Back (tail) = Least recently used
pub struct RecencyList<K> {
    map: HashMap<K, usize>,
    nodes: Vec<Option<Node<K>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<K> Default for RecencyList<K> {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
        }
    }
}

impl<K> RecencyList<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used (moves or inserts it at the front).
    pub fn touch(&mut self, key: K) {
        if let Some(&idx) = self.map.get(&key) {
            if self.head != Some(idx) {
                self.unlink(idx);
                self.link_front(idx);
            }
            return;
        }

        let idx = self.alloc(Node {
            key: key.clone(),
            prev: None,
            next: None,
        });
        self.link_front(idx);
        self.map.insert(key, idx);
    }

    // == Remove ==
    /// Removes a key from the list. Returns true if it was tracked.
    pub fn remove(&mut self, key: &K) -> bool {
        match self.map.remove(key) {
            Some(idx) => {
                self.unlink(idx);
                self.release(idx);
                true
            }
            None => false,
        }
    }

    // == Pop Oldest ==
    /// Removes and returns the least recently used key.
    pub fn pop_oldest(&mut self) -> Option<K> {
        let idx = self.tail?;
        self.unlink(idx);
        let node = self.release(idx)?;
        self.map.remove(&node.key);
        Some(node.key)
    }

    /// Returns the least recently used key without removing it.
    #[cfg(test)]
    pub fn peek_oldest(&self) -> Option<&K> {
        self.tail
            .and_then(|idx| self.nodes[idx].as_ref())
            .map(|node| &node.key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            match &self.nodes[idx] {
                Some(node) => {
                    keys.push(node.key.clone());
                    cursor = node.next;
                }
                None => break,
            }
        }
        keys
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }

    fn alloc(&mut self, node: Node<K>) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = Some(node);
                idx
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, idx: usize) -> Option<Node<K>> {
        let node = self.nodes[idx].take();
        if node.is_some() {
            self.free.push(idx);
        }
        node
    }

    fn link_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(node) = &mut self.nodes[idx] {
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(head_idx) => {
                if let Some(head) = &mut self.nodes[head_idx] {
                    head.prev = Some(idx);
                }
            }
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match &self.nodes[idx] {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev {
            Some(prev_idx) => {
                if let Some(prev_node) = &mut self.nodes[prev_idx] {
                    prev_node.next = next;
                }
            }
            None => self.head = next,
        }

        match next {
            Some(next_idx) => {
                if let Some(next_node) = &mut self.nodes[next_idx] {
                    next_node.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(node) = &mut self.nodes[idx] {
            node.prev = None;
            node.next = None;
        }
    }
}

// == LRU Tracker ==
/// Capacity-bounded recency tracking fed by append-only raw logs.
pub struct LruTracker<K> {
    capacity: usize,
    /// Keys written since the last sync, fed from drained pending events
    writes: EventLog<K>,
    /// Keys read since the last sync, appended on the read path
    reads: EventLog<K>,
    list: RwLock<RecencyList<K>>,
}

impl<K> LruTracker<K>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            writes: EventLog::new(),
            reads: EventLog::new(),
            list: RwLock::new(RecencyList::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // == Push ==
    /// Records that the key was written. O(1), never takes the list lock.
    pub fn push(&self, key: K) {
        self.writes.push(key);
    }

    /// Records that the key was read. O(1), never takes the list lock.
    pub fn push_read(&self, key: K) {
        self.reads.push(key);
    }

    // == Remove ==
    /// Stops tracking a key removed outside the eviction path.
    pub fn remove(&self, key: &K) -> bool {
        self.list.write().remove(key)
    }

    // == Sync And Evict ==
    /// Replays the write log, then the read log, each in order, then pops
    /// least recently used keys until the tracked size is within capacity.
    ///
    /// Reads are replayed last, so a key read during the cycle ranks ahead of
    /// every key written during it.
    ///
    /// Logged keys for which `is_live` returns false are skipped, so keys
    /// deleted since they were logged are not tracked again.
    /// Returns the evicted keys, oldest first.
    pub fn sync_and_evict<F>(&self, is_live: F) -> Vec<K>
    where
        F: Fn(&K) -> bool,
    {
        let mut list = self.list.write();
        for key in self.writes.drain().chain(self.reads.drain()) {
            if is_live(&key) {
                list.touch(key);
            }
        }

        let excess = list.len().saturating_sub(self.capacity);
        let mut evicted = Vec::with_capacity(excess);
        for _ in 0..excess {
            match list.pop_oldest() {
                Some(key) => evicted.push(key),
                None => break,
            }
        }
        evicted
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.list.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of raw log entries waiting for the next sync.
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.writes.len() + self.reads.len()
    }

    /// Tracked keys from most to least recently used.
    pub fn keys(&self) -> Vec<K> {
        self.list.read().keys()
    }

    /// Drops every tracked key. Raw log entries are kept.
    pub fn clear(&self) {
        self.list.write().clear();
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_new() {
        let list: RecencyList<&str> = RecencyList::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert_eq!(list.peek_oldest(), None);
    }

    #[test]
    fn test_list_touch_new_key() {
        let mut list = RecencyList::new();

        list.touch("key1");
        list.touch("key2");
        list.touch("key3");

        assert_eq!(list.len(), 3);
        assert_eq!(list.peek_oldest(), Some(&"key1"));
        assert_eq!(list.keys(), vec!["key3", "key2", "key1"]);
    }

    #[test]
    fn test_list_touch_existing_key() {
        let mut list = RecencyList::new();

        list.touch("key1");
        list.touch("key2");
        list.touch("key3");
        list.touch("key1");

        assert_eq!(list.len(), 3);
        assert_eq!(list.peek_oldest(), Some(&"key2"));
    }

    #[test]
    fn test_list_touch_tail_updates_tail() {
        let mut list = RecencyList::new();

        list.touch("a");
        list.touch("b");
        list.touch("a");

        assert_eq!(list.keys(), vec!["a", "b"]);
        assert_eq!(list.peek_oldest(), Some(&"b"));
    }

    #[test]
    fn test_list_pop_oldest() {
        let mut list = RecencyList::new();

        list.touch("key1");
        list.touch("key2");
        list.touch("key3");

        assert_eq!(list.pop_oldest(), Some("key1"));
        assert_eq!(list.len(), 2);
        assert_eq!(list.pop_oldest(), Some("key2"));
        assert_eq!(list.pop_oldest(), Some("key3"));
        assert_eq!(list.pop_oldest(), None);
        assert!(list.is_empty());
    }

    #[test]
    fn test_list_remove() {
        let mut list = RecencyList::new();

        list.touch("key1");
        list.touch("key2");
        list.touch("key3");

        assert!(list.remove(&"key2"));
        assert!(!list.remove(&"nonexistent"));

        assert_eq!(list.len(), 2);
        assert!(!list.contains(&"key2"));
        assert_eq!(list.keys(), vec!["key3", "key1"]);
    }

    #[test]
    fn test_list_reuses_freed_slots() {
        let mut list = RecencyList::new();

        list.touch("a");
        list.touch("b");
        list.remove(&"a");
        list.touch("c");

        assert_eq!(list.nodes.len(), 2);
        assert_eq!(list.keys(), vec!["c", "b"]);
    }

    #[test]
    fn test_list_order_after_multiple_touches() {
        let mut list = RecencyList::new();

        // touch(a), touch(b), touch(c) -> [c, b, a]
        list.touch("a");
        list.touch("b");
        list.touch("c");
        // touch(a) -> [a, c, b], touch(c) -> [c, a, b], touch(b) -> [b, c, a]
        list.touch("a");
        list.touch("c");
        list.touch("b");

        assert_eq!(list.pop_oldest(), Some("a"));
        assert_eq!(list.pop_oldest(), Some("c"));
        assert_eq!(list.pop_oldest(), Some("b"));
    }

    #[test]
    fn test_tracker_push_is_deferred() {
        let tracker = LruTracker::new(10);

        tracker.push("a");
        tracker.push("b");

        assert_eq!(tracker.len(), 0);
        assert_eq!(tracker.pending(), 2);

        tracker.sync_and_evict(|_| true);

        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.pending(), 0);
    }

    #[test]
    fn test_tracker_evicts_least_recent_over_capacity() {
        let tracker = LruTracker::new(2);

        for key in 0..10 {
            tracker.push(key);
        }
        let evicted = tracker.sync_and_evict(|_| true);

        assert_eq!(evicted, (0..8).collect::<Vec<_>>());
        assert_eq!(tracker.keys(), vec![9, 8]);
    }

    #[test]
    fn test_tracker_replay_promotes_in_order() {
        let tracker = LruTracker::new(2);

        tracker.push("a");
        tracker.push("b");
        tracker.sync_and_evict(|_| true);
        tracker.push("a");
        tracker.push("c");
        let evicted = tracker.sync_and_evict(|_| true);

        assert_eq!(evicted, vec!["b"]);
        assert_eq!(tracker.keys(), vec!["c", "a"]);
    }

    #[test]
    fn test_tracker_replays_reads_after_writes() {
        let tracker = LruTracker::new(3);

        tracker.push("a");
        tracker.push("b");
        tracker.push("c");
        tracker.push_read("a");
        tracker.push("d");
        tracker.push("e");
        assert_eq!(tracker.pending(), 6);

        let evicted = tracker.sync_and_evict(|_| true);

        assert_eq!(evicted, vec!["b", "c"]);
        assert_eq!(tracker.keys(), vec!["a", "e", "d"]);
    }

    #[test]
    fn test_tracker_skips_dead_keys() {
        let tracker = LruTracker::new(5);

        tracker.push("live");
        tracker.push("gone");
        tracker.sync_and_evict(|key| *key == "live");

        assert_eq!(tracker.keys(), vec!["live"]);
    }

    #[test]
    fn test_tracker_remove_and_clear() {
        let tracker = LruTracker::new(5);
        tracker.push("a");
        tracker.push("b");
        tracker.sync_and_evict(|_| true);

        assert!(tracker.remove(&"a"));
        assert_eq!(tracker.keys(), vec!["b"]);

        tracker.clear();
        assert!(tracker.is_empty());
    }
}
