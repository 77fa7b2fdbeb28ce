//! In-flight call registry for request coalescing
//!
//! At most one flight exists per key. The first caller to register becomes
//! the owner and receives a guard that deregisters the entry when the owner
//! settles; later callers receive a clone of the same shared future and
//! observe the owner's outcome without starting work of their own.
//!
//! An entry whose owner token has been cancelled is treated as vacated:
//! lookups skip it and the next `register` replaces it, so a superseded
//! flight never captures new joiners while it winds down.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Cloneable handle to a flight's eventual outcome. Every clone resolves
/// to the same value; polling any of them drives the underlying call.
pub type SharedOutcome<T> = Shared<BoxFuture<'static, T>>;

struct FlightSlot<T> {
    id: u64,
    outcome: SharedOutcome<T>,
    owner: CancellationToken,
}

struct RegistryInner<T> {
    slots: Mutex<HashMap<String, FlightSlot<T>>>,
    next_id: AtomicU64,
}

/// Registry of in-flight calls keyed by cache key.
///
/// Clones share the same table. Entries are removed by the owner's
/// [`FlightGuard`], by [`remove`](Self::remove), or by
/// [`clear`](Self::clear); none of those interrupt a flight that joiners
/// are still awaiting.
pub struct InflightRegistry<T> {
    inner: Arc<RegistryInner<T>>,
}

/// Outcome of [`InflightRegistry::register`].
pub enum Registration<T> {
    /// The caller owns the flight: it must await `outcome` to drive the
    /// call and hold `guard` until the outcome settles.
    Owner {
        outcome: SharedOutcome<T>,
        guard: FlightGuard<T>,
    },
    /// Another owner got there first; the provided future was discarded
    /// and the caller should await this shared handle instead.
    Joined(SharedOutcome<T>),
}

impl<T: Clone + Send + 'static> InflightRegistry<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                slots: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Atomically claim `key` or join the flight already holding it.
    ///
    /// If a live entry exists the provided future is dropped unpolled and
    /// the existing shared outcome is returned. Otherwise the future is
    /// installed (replacing any vacated entry) and the caller becomes the
    /// owner.
    pub fn register(
        &self,
        key: impl Into<String>,
        owner: CancellationToken,
        future: impl Future<Output = T> + Send + 'static,
    ) -> Registration<T> {
        let key = key.into();
        let mut slots = self.inner.slots.lock();
        if let Some(slot) = slots.get(&key) {
            if !slot.owner.is_cancelled() {
                debug!(key = %key, "joined in-flight call");
                return Registration::Joined(slot.outcome.clone());
            }
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let outcome = future.boxed().shared();
        slots.insert(key.clone(), FlightSlot { id, outcome: outcome.clone(), owner });
        debug!(key = %key, "registered in-flight call");

        Registration::Owner { outcome, guard: FlightGuard { registry: self.clone(), key, id } }
    }

    /// Whether a live flight holds `key`.
    pub fn has(&self, key: &str) -> bool {
        self.inner
            .slots
            .lock()
            .get(key)
            .is_some_and(|slot| !slot.owner.is_cancelled())
    }

    /// Shared outcome of the live flight holding `key`, if any.
    pub fn join(&self, key: &str) -> Option<SharedOutcome<T>> {
        self.inner
            .slots
            .lock()
            .get(key)
            .filter(|slot| !slot.owner.is_cancelled())
            .map(|slot| slot.outcome.clone())
    }

    /// Forget the entry for `key`, returning whether one existed. Joiners
    /// already holding the shared outcome are unaffected.
    pub fn remove(&self, key: &str) -> bool {
        self.inner.slots.lock().remove(key).is_some()
    }

    /// Forget every entry. Bookkeeping only: outstanding flights keep
    /// running for whoever holds their outcome handles.
    pub fn clear(&self) {
        self.inner.slots.lock().clear();
    }

    /// Number of registered entries, counting vacated ones not yet
    /// replaced or removed.
    pub fn len(&self) -> usize {
        self.inner.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.slots.lock().is_empty()
    }
}

impl<T: Clone + Send + 'static> Default for InflightRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for InflightRegistry<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T> std::fmt::Debug for InflightRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InflightRegistry")
            .field("entries", &self.inner.slots.lock().len())
            .finish()
    }
}

/// Deregisters the owner's entry when dropped.
///
/// The guard records the registration id it was issued for and leaves the
/// slot alone if a replacement has claimed the key since, so a stale guard
/// from a superseded flight never evicts its successor.
pub struct FlightGuard<T> {
    registry: InflightRegistry<T>,
    key: String,
    id: u64,
}

impl<T> Drop for FlightGuard<T> {
    fn drop(&mut self) {
        let mut slots = self.registry.inner.slots.lock();
        if slots.get(&self.key).is_some_and(|slot| slot.id == self.id) {
            slots.remove(&self.key);
            debug!(key = %self.key, "deregistered in-flight call");
        }
    }
}

impl<T> std::fmt::Debug for FlightGuard<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightGuard")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}
