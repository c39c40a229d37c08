//! `MemoizingCache` — a keyed generative cache.
//!
//! Each key maps to its own [`OnceSlot`], created on first lookup. The cache
//! owns one compute function ([`Compute`]); `get(key)`
//! computes the value for `key` on first access and returns the stored value
//! on every later access.
//!
//! # Concurrency
//!
//! A single map lock guards the get-or-insert of the per-key slot and is
//! released before any computation starts. The computation then runs under the
//! slot's own lock. Together this guarantees:
//!
//! - **at most one successful computation per key**, including when several
//!   threads race on a key nobody has seen yet (they all find the same slot);
//! - computations for distinct keys run in parallel;
//! - failed computations leave no entry behind, and the next lookup retries.
//!
//! A slot that holds a value is never removed, so references returned by
//! [`get`](MemoizingCache::get) live as long as the borrow of the cache. A slot
//! whose computation failed is dropped from the map by the last lookup still
//! holding it; lookups that were waiting on it retry in the same slot.

mod compute;

pub use compute::{Compute, Partial, Total};

use core::borrow::Borrow;
use core::fmt;
use core::hash::Hash;
use std::collections::HashMap;
use std::sync::Arc;

use crate::cell::OnceSlot;
use crate::concurrency::sync::Mutex;
use crate::error::MemoError;

type Slots<K, V> = HashMap<K, Arc<OnceSlot<V>>>;

/// A thread-safe cache that computes each key's value at most once.
///
/// ```rust
/// use lazymemo::MemoizingCache;
/// use std::convert::Infallible;
///
/// let hex = MemoizingCache::new(|key: &i64| Ok::<_, Infallible>(format!("{key:x}")));
/// assert_eq!(hex.get(27).unwrap(), "1b");
/// assert_eq!(hex.get(-97).unwrap(), "ffffffffffffff9f");
/// ```
pub struct MemoizingCache<K, C: Compute<K>> {
    compute: C,
    slots: Mutex<Slots<K, C::Value>>,
}

impl<K, F> MemoizingCache<K, Total<F>>
where
    K: Eq + Hash + Clone,
    Total<F>: Compute<K>,
{
    /// Creates a cache around a compute function that always yields a value.
    pub fn new<V, E>(compute: F) -> Self
    where
        F: Fn(&K) -> Result<V, E>,
    {
        Self::from_compute(Total(compute))
    }

    /// Like [`new`](Self::new), with room for `capacity` keys before the map
    /// reallocates.
    pub fn with_capacity<V, E>(capacity: usize, compute: F) -> Self
    where
        F: Fn(&K) -> Result<V, E>,
    {
        Self::from_compute_with_capacity(capacity, Total(compute))
    }
}

impl<K, F> MemoizingCache<K, Partial<F>>
where
    K: Eq + Hash + Clone,
    Partial<F>: Compute<K>,
{
    /// Creates a cache around a compute function that may return `Ok(None)`.
    ///
    /// A `None` result surfaces as [`MemoError::EmptyComputedValue`] and is not
    /// cached.
    pub fn with_partial<V, E>(compute: F) -> Self
    where
        F: Fn(&K) -> Result<Option<V>, E>,
    {
        Self::from_compute(Partial(compute))
    }
}

impl<K, C> MemoizingCache<K, C>
where
    K: Eq + Hash + Clone,
    C: Compute<K>,
{
    /// Creates a cache around an arbitrary [`Compute`] implementation.
    pub fn from_compute(compute: C) -> Self {
        Self {
            compute,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Like [`from_compute`](Self::from_compute), with a pre-sized map.
    pub fn from_compute_with_capacity(capacity: usize, compute: C) -> Self {
        Self {
            compute,
            slots: Mutex::new(HashMap::with_capacity(capacity)),
        }
    }

    /// Returns the value for `key`, computing and caching it on first access.
    ///
    /// # Errors
    /// - [`MemoError::ComputationFailed`] if the compute function failed;
    /// - [`MemoError::EmptyComputedValue`] if it produced no value.
    ///
    /// In both cases nothing is cached for `key` and the next call retries.
    ///
    /// The compute function may look up other keys, but looking up `key`
    /// itself deadlocks.
    pub fn get(&self, key: K) -> Result<&C::Value, MemoError<C::Error>> {
        let slot = self.slot_for(&key);
        let result = slot
            .get_or_try_init(|| match self.compute.compute(&key) {
                Ok(Some(value)) => Ok(value),
                Ok(None) => Err(MemoError::EmptyComputedValue),
                Err(cause) => Err(MemoError::ComputationFailed(cause)),
            })
            .map(|value| value as *const C::Value);
        match result {
            // SAFETY: the slot is computed, and computed slots stay in the map
            // until the cache is consumed, so the value outlives `&self`.
            Ok(value) => Ok(unsafe { &*value }),
            Err(err) => {
                self.release_failed(&key, slot);
                Err(err)
            }
        }
    }

    /// Makes sure the value for `key` is cached, discarding it.
    ///
    /// # Errors
    /// Same as [`get`](Self::get).
    #[inline]
    pub fn ensure(&self, key: K) -> Result<(), MemoError<C::Error>> {
        self.get(key).map(|_| ())
    }

    /// Alias of [`get`](Self::get).
    ///
    /// # Errors
    /// Same as [`get`](Self::get).
    #[inline]
    pub fn find_or_create(&self, key: K) -> Result<&C::Value, MemoError<C::Error>> {
        self.get(key)
    }

    /// Ensures every key in turn, stopping at the first failure.
    ///
    /// # Errors
    /// The first error returned by [`ensure`](Self::ensure).
    pub fn ensure_all<I>(&self, keys: I) -> Result<(), MemoError<C::Error>>
    where
        I: IntoIterator<Item = K>,
    {
        keys.into_iter().try_for_each(|key| self.ensure(key))
    }

    /// Ensures the keys concurrently on the rayon pool.
    ///
    /// Once a key fails, keys not yet started may be skipped.
    ///
    /// # Errors
    /// One of the errors returned by [`ensure`](Self::ensure).
    #[cfg(feature = "parallel")]
    pub fn par_ensure_all<I>(&self, keys: I) -> Result<(), MemoError<C::Error>>
    where
        I: rayon::iter::IntoParallelIterator<Item = K>,
        Self: Sync,
        C::Error: Send,
    {
        use rayon::iter::ParallelIterator;
        keys.into_par_iter().try_for_each(|key| self.ensure(key))
    }

    /// Returns the cached value for `key` without computing anything.
    pub fn peek<Q>(&self, key: &Q) -> Option<&C::Value>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        let value = {
            let slots = self.slots.lock();
            slots.get(key)?.get()? as *const C::Value
        };
        // SAFETY: only computed slots hand out a value, and computed slots are
        // never removed while `self` is borrowed.
        Some(unsafe { &*value })
    }

    /// Returns `true` if a value is cached for `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        self.peek(key).is_some()
    }

    /// Returns the number of keys with a cached value.
    ///
    /// Keys whose computation failed, or is still running, are not counted.
    pub fn len(&self) -> usize {
        self.slots.lock().values().filter(|slot| slot.is_computed()).count()
    }

    /// Returns `true` if no value is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the compute function.
    pub fn compute_fn(&self) -> &C {
        &self.compute
    }

    /// Consumes the cache, returning every cached key/value pair.
    pub fn into_computed(self) -> HashMap<K, C::Value> {
        self.slots
            .into_inner()
            .into_iter()
            .filter_map(|(key, slot)| {
                let value = Arc::try_unwrap(slot).ok()?.into_inner()?;
                Some((key, value))
            })
            .collect()
    }

    /// Returns the slot for `key`, inserting an empty one if the key is new.
    fn slot_for(&self, key: &K) -> Arc<OnceSlot<C::Value>> {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get(key) {
            return Arc::clone(slot);
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(entries = slots.len(), "inserting memo slot");
        let slot = Arc::new(OnceSlot::new());
        slots.insert(key.clone(), Arc::clone(&slot));
        slot
    }

    /// Drops the caller's hold on a slot whose computation failed, removing
    /// the entry if no other lookup holds it.
    ///
    /// Slots are handed out under the map lock and failing holders let go
    /// under it too, so the last failing holder sees a count of two: the map's
    /// and its own.
    fn release_failed(&self, key: &K, slot: Arc<OnceSlot<C::Value>>) {
        let mut slots = self.slots.lock();
        let unshared = Arc::strong_count(&slot) == 2 && !slot.is_computed();
        if unshared && slots.get(key).is_some_and(|current| Arc::ptr_eq(current, &slot)) {
            #[cfg(feature = "tracing")]
            tracing::trace!(entries = slots.len(), "removing failed memo slot");
            slots.remove(key);
        }
        drop(slot);
    }
}

impl<K, C> fmt::Debug for MemoizingCache<K, C>
where
    K: Eq + Hash + Clone,
    C: Compute<K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizingCache")
            .field("computed", &self.len())
            .finish_non_exhaustive()
    }
}
