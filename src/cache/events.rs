//! Event Log Module
//!
//! Unbounded FIFO logs with many appenders and one consumer, used to defer
//! index and recency bookkeeping off the read/write path.

use crossbeam_channel::{unbounded, Receiver, Sender};

// == Pending Event ==
/// A key whose expiration changed to `expire_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEvent<K> {
    pub key: K,
    pub expire_at: i64,
}

impl<K> PendingEvent<K> {
    pub fn new(key: K, expire_at: i64) -> Self {
        Self { key, expire_at }
    }
}

// == Event Log ==
#[derive(Debug)]
pub struct EventLog<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> Default for EventLog<T> {
    fn default() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }
}

impl<T> EventLog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item. Never blocks.
    pub fn push(&self, item: T) {
        // Both ends live in `self`, so the channel cannot be disconnected.
        let _ = self.tx.send(item);
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Takes every item queued when the drain starts, oldest first.
    ///
    /// Items appended while draining stay queued for the next drain.
    pub fn drain(&self) -> impl Iterator<Item = T> + '_ {
        let pending = self.rx.len();
        self.rx.try_iter().take(pending)
    }
}
