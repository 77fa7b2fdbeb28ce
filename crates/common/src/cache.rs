//! Time-bounded response cache with lazy expiry
//!
//! Entries are stamped when stored; each reader applies its own freshness
//! window at lookup, so the same entry can be fresh for one caller and
//! stale for another. Stale entries are evicted by the lookup that observes
//! them, not by a background sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::debug;

use crate::clock::{Clock, SystemClock};

#[derive(Debug, Clone)]
struct CacheSlot<V> {
    value: V,
    stored_at: Instant,
}

/// Process-wide map from cache key to a timestamped response value.
///
/// Clones share the same storage, so one cache can be handed to many
/// owners. `V` is cloned out on every hit; wrap large values in `Arc` if
/// that matters.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use breakwater_common::ResponseCache;
///
/// let cache: ResponseCache<String> = ResponseCache::new();
/// cache.insert("read:/users", "body".to_string());
/// assert_eq!(
///     cache.get("read:/users", Duration::from_secs(30)),
///     Some("body".to_string()),
/// );
/// ```
#[derive(Debug)]
pub struct ResponseCache<V, C = SystemClock> {
    slots: Arc<RwLock<HashMap<String, CacheSlot<V>>>>,
    clock: C,
}

impl<V: Clone> ResponseCache<V, SystemClock> {
    /// Cache reading time from the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<V: Clone> Default for ResponseCache<V, SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone, C: Clock> ResponseCache<V, C> {
    /// Cache reading time from `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self { slots: Arc::new(RwLock::new(HashMap::new())), clock }
    }

    /// Look up `key`, applying the caller's freshness window.
    ///
    /// Returns the stored value only while `now - stored_at < ttl`; an
    /// entry observed past the caller's window is evicted and `None` is
    /// returned.
    pub fn get(&self, key: &str, ttl: Duration) -> Option<V> {
        let now = self.clock.now();
        let mut slots = self.slots.write();
        match slots.get(key) {
            Some(slot) if now.duration_since(slot.stored_at) < ttl => Some(slot.value.clone()),
            Some(_) => {
                slots.remove(key);
                debug!(key = %key, "evicted expired cache entry");
                None
            }
            None => None,
        }
    }

    /// Store `value` under `key`, overwriting any previous entry and
    /// refreshing its timestamp.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        let stored_at = self.clock.now();
        self.slots.write().insert(key.into(), CacheSlot { value, stored_at });
    }

    /// Remove the entry for `key`, returning whether one existed.
    pub fn remove(&self, key: &str) -> bool {
        self.slots.write().remove(key).is_some()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.slots.write().clear();
    }

    /// Remove every entry whose key contains `pattern` as a substring,
    /// returning how many were dropped.
    pub fn remove_matching(&self, pattern: &str) -> usize {
        let mut slots = self.slots.write();
        let before = slots.len();
        slots.retain(|key, _| !key.contains(pattern));
        let removed = before - slots.len();
        if removed > 0 {
            debug!(pattern = %pattern, removed, "invalidated cache entries");
        }
        removed
    }

    /// Proactively drop entries older than `ttl`, returning how many were
    /// swept. Lookups already evict lazily; this is for embedders that want
    /// bounded memory between lookups.
    pub fn purge_expired(&self, ttl: Duration) -> usize {
        let now = self.clock.now();
        let mut slots = self.slots.write();
        let before = slots.len();
        slots.retain(|_, slot| now.duration_since(slot.stored_at) < ttl);
        before - slots.len()
    }

    /// Number of stored entries, counting stale ones not yet evicted.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Whether the cache holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

impl<V, C: Clone> Clone for ResponseCache<V, C> {
    fn clone(&self) -> Self {
        Self { slots: Arc::clone(&self.slots), clock: self.clock.clone() }
    }
}
