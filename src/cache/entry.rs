//! Cache Entry Module
//!
//! Defines stored entries, TTL inputs and remaining-lifetime reports.

use std::time::Duration;

use chrono::Utc;

/// Expiration stamp of entries that never expire.
///
/// Kept as a plain timestamp so liveness checks are a single comparison.
pub const NEVER_EXPIRE: i64 = i64::MAX;

/// Offset used to stamp removal events firmly in the past.
pub(crate) const REMOVED_OFFSET_MS: i64 = 1_000_000;

// == Cache Entry ==
/// A stored value with its absolute expiration time.
///
/// Entries are replaced wholesale on every write, never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Expiration timestamp (Unix milliseconds), `NEVER_EXPIRE` = no expiration
    pub expire_at: i64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry expiring at the given absolute timestamp.
    pub fn new(value: V, expire_at: i64) -> Self {
        Self { value, expire_at }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Checks expiration against an explicit clock reading.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expire_at
    }

    // == Remaining Lifetime ==
    /// Returns the remaining lifetime as seen at `now_ms`.
    pub fn expiry_at(&self, now_ms: i64) -> Expiry {
        Expiry::from_stamp(self.expire_at, now_ms)
    }
}

// == Ttl ==
/// Time-to-live requested by a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ttl {
    /// The entry never expires.
    #[default]
    Never,
    /// The entry expires after the given duration.
    After(Duration),
    /// The entry is already expired; writing it deletes the key.
    Expired,
}

impl Ttl {
    /// Builds a TTL from signed milliseconds: `0` never expires, negative deletes.
    pub fn from_millis(ms: i64) -> Self {
        match ms {
            0 => Ttl::Never,
            ms if ms < 0 => Ttl::Expired,
            ms => Ttl::After(Duration::from_millis(ms as u64)),
        }
    }

    /// Builds a TTL from whole seconds.
    pub fn secs(secs: u64) -> Self {
        Duration::from_secs(secs).into()
    }

    /// Builds a TTL from milliseconds.
    pub fn millis(ms: u64) -> Self {
        Duration::from_millis(ms).into()
    }

    /// Returns true when a write with this TTL should delete the key.
    pub fn is_expired(&self) -> bool {
        matches!(self, Ttl::Expired)
    }

    /// Absolute expiration stamp for a write performed at `now_ms`.
    pub fn expire_at(&self, now_ms: i64) -> i64 {
        match self {
            Ttl::Never => NEVER_EXPIRE,
            Ttl::After(ttl) => {
                let ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
                now_ms.saturating_add(ms)
            }
            Ttl::Expired => now_ms - REMOVED_OFFSET_MS,
        }
    }
}

impl From<Duration> for Ttl {
    fn from(ttl: Duration) -> Self {
        if ttl.is_zero() {
            Ttl::Never
        } else {
            Ttl::After(ttl)
        }
    }
}

// == Expiry ==
/// Remaining lifetime of a live entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// The entry never expires.
    Never,
    /// The entry expires after the given duration.
    In(Duration),
}

impl Expiry {
    pub(crate) fn from_stamp(expire_at: i64, now_ms: i64) -> Self {
        if expire_at == NEVER_EXPIRE {
            Expiry::Never
        } else {
            let remaining = expire_at.saturating_sub(now_ms).max(0);
            Expiry::In(Duration::from_millis(remaining as u64))
        }
    }

    /// Returns the remaining duration, or None for entries that never expire.
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Expiry::Never => None,
            Expiry::In(d) => Some(*d),
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}
