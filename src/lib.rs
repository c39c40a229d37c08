//! # `lazymemo` - Thread-Safe Memoization Primitives
//!
//! Two primitives that compute a value on demand and never compute it twice:
//!
//! - [`LazyCell<T, F>`]: a single value produced by `F: FnMut() -> Result<T, E>`
//!   on first access.
//! - [`MemoizingCache<K, C>`]: one value per key, produced by a [`Compute`]
//!   implementation on the first lookup of that key.
//!
//! ## Guarantees
//!
//! ### At-most-once computation
//! - A cell runs its compute function until it first succeeds, and never again.
//!   Any number of threads may race on the first access; exactly one computes,
//!   the others block and then observe its value.
//! - A cache upholds the same guarantee per key, including for concurrent first
//!   lookups of a key nobody has seen yet.
//!
//! ### Failures are not cached
//! - An error is returned to the caller whose computation failed and nothing is
//!   stored. The next access retries. A panicking compute function behaves the
//!   same way once the panic is caught.
//!
//! ### Lock-free reads
//! - Once published, a value is read with a single `Acquire` load. The
//!   `Release` publish establishes happens-before with every later reader.
//!
//! ## Architecture
//!
//! 1. **`concurrency::sync::Mutex`**: a futex-parked, non-poisoning lock.
//! 2. **`cell::OnceSlot`**: an explicit `Uninit | Computing | Computed` tag,
//!    a lock for the transition, and the value storage.
//! 3. **`cell::LazyCell`**: a slot plus the function that fills it.
//! 4. **`collections::MemoizingCache`**: a lock-guarded map from keys to slots.
//!
//! ## Example
//!
//! ```rust
//! use lazymemo::{LazyCell, MemoError, MemoizingCache};
//! use std::convert::Infallible;
//!
//! let config = LazyCell::new(|| Ok::<_, Infallible>(vec!["a", "b"]));
//! assert_eq!(config.get().unwrap().len(), 2);
//!
//! let lengths = MemoizingCache::with_partial(|word: &String| {
//!     Ok::<_, Infallible>((!word.is_empty()).then(|| word.len()))
//! });
//! assert_eq!(lengths.get("memo".to_owned()), Ok(&4));
//! assert_eq!(lengths.get(String::new()), Err(MemoError::EmptyComputedValue));
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod cell;
pub mod collections;
pub mod concurrency;
pub mod error;

pub use cell::{LazyCell, OnceSlot, SlotState};
pub use collections::{Compute, MemoizingCache, Partial, Total};
pub use error::MemoError;

// Compile-time layout checks.
const _: () = {
    use core::mem;

    // The state tag is one byte.
    assert!(mem::size_of::<SlotState>() == 1);

    // A slot is the value plus a small fixed header (tag + lock word).
    assert!(mem::size_of::<OnceSlot<u64>>() <= mem::size_of::<u64>() + mem::size_of::<usize>() * 2);
};
