//! Cell family - single-value memoization primitives.
//!
//! - `lazy::once_slot` is the tagged write-once slot with a lock-free read path.
//! - `lazy::lazy_cell` binds a slot to the function that fills it.

pub mod lazy;

pub use lazy::{LazyCell, OnceSlot, SlotState};
