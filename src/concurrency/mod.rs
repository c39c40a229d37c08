//! Concurrency building blocks for the memoization primitives.
//!
//! Important: nothing here is async. Every blocking operation parks the
//! calling OS thread.

pub mod sync;
