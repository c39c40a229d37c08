//! Lazy/once initialization primitives (thread-safe, fallible).

pub mod lazy_cell;
pub mod once_slot;

pub use lazy_cell::LazyCell;
pub use once_slot::{OnceSlot, SlotState};
