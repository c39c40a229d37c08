//! Keyed memoization structures.
//!
//! - `memoizing_cache`: a generative cache that computes each key's value once.

pub mod memoizing_cache;

pub use memoizing_cache::{Compute, MemoizingCache, Partial, Total};
