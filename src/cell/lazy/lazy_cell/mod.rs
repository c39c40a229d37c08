//! `LazyCell` — a thread-safe value computed on first access, at most once.
//!
//! The cell owns its compute function (`F: FnMut() -> Result<T, E>`). The
//! first `get` runs it; every later `get` returns the stored value through a
//! single atomic load. A failed computation is not remembered: the error goes
//! back to the caller that ran it and the next `get` tries again.


use core::cell::UnsafeCell;
use core::fmt;

use super::once_slot::{OnceSlot, SlotState};

/// A lazily computed, thread-safe value.
///
/// ```rust
/// use lazymemo::LazyCell;
/// use std::convert::Infallible;
///
/// let cell = LazyCell::new(|| Ok::<_, Infallible>(6 * 7));
/// assert!(!cell.is_computed());
/// assert_eq!(cell.get(), Ok(&42));
/// assert!(cell.is_computed());
/// ```
pub struct LazyCell<T, F> {
    slot: OnceSlot<T>,
    init: UnsafeCell<F>,
}

// SAFETY: `init` is only touched inside `OnceSlot::get_or_try_init`'s
// initializer, which runs while the slot lock is held, so at most one thread
// uses it at a time. The value side follows `OnceSlot`'s own requirements.
unsafe impl<T: Send + Sync, F: Send> Sync for LazyCell<T, F> {}

impl<T, E, F> LazyCell<T, F>
where
    F: FnMut() -> Result<T, E>,
{
    /// Creates a cell bound to `init`. Nothing is computed yet.
    pub fn new(init: F) -> Self {
        Self {
            slot: OnceSlot::new(),
            init: UnsafeCell::new(init),
        }
    }

    /// Returns the value, computing it first if needed.
    ///
    /// Callers that arrive while another thread is computing block until that
    /// computation ends, then either see its value or, if it failed, run the
    /// compute function themselves.
    ///
    /// The compute function must not call `get` on the same cell; that
    /// deadlocks.
    ///
    /// # Errors
    /// Returns whatever error the compute function produced on this call.
    #[inline]
    pub fn get(&self) -> Result<&T, E> {
        self.slot.get_or_try_init(|| {
            // SAFETY: we are inside the slot's critical section.
            let init = unsafe { &mut *self.init.get() };
            init()
        })
    }
}

impl<T, F> LazyCell<T, F> {
    /// Returns `true` once the value has been computed.
    #[inline]
    pub fn is_computed(&self) -> bool {
        self.slot.is_computed()
    }

    /// Returns the lifecycle state of the cell.
    #[inline]
    pub fn state(&self) -> SlotState {
        self.slot.state()
    }

    /// Returns the value if it has been computed. Never computes, never blocks.
    #[inline]
    pub fn peek(&self) -> Option<&T> {
        self.slot.get()
    }

    /// Returns a mutable reference to the computed value, if any.
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.slot.get_mut()
    }

    /// Consumes the cell, returning the value if it was computed.
    pub fn into_inner(self) -> Option<T> {
        self.slot.into_inner()
    }
}

impl<T: fmt::Debug, F> fmt::Debug for LazyCell<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_tuple("LazyCell");
        match self.peek() {
            Some(value) => d.field(value),
            None => d.field(&format_args!("<uncomputed>")),
        };
        d.finish()
    }
}
