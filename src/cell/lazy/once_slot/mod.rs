//! `OnceSlot` — a thread-safe, fallible, write-once slot.
//!
//! This is the synchronization core shared by [`LazyCell`](super::LazyCell) and
//! [`MemoizingCache`](crate::collections::MemoizingCache). The slot carries an
//! explicit tag (`Uninit`, `Computing`, `Computed`) in an atomic byte:
//!
//! - readers that observe `Computed` with an `Acquire` load return the value
//!   directly, without touching the lock;
//! - everybody else serializes on the slot lock, re-checks the tag and, if it is
//!   still not `Computed`, runs the initializer while holding the lock;
//! - a successful initializer writes the value and then publishes `Computed`
//!   with a `Release` store, which is the happens-before edge every later
//!   reader synchronizes with;
//! - a failing (or panicking) initializer puts the tag back to `Uninit`, so the
//!   next caller retries. Failures are never cached.

mod state;

use core::cell::UnsafeCell;
use core::convert::Infallible;
use core::fmt;
use core::mem::{self, MaybeUninit};
use core::sync::atomic::{AtomicU8, Ordering};

use crate::concurrency::sync::Mutex;

pub use state::SlotState;

const UNINIT: u8 = SlotState::Uninit as u8;
const COMPUTING: u8 = SlotState::Computing as u8;
const COMPUTED: u8 = SlotState::Computed as u8;

/// A write-once slot whose initialization may fail and be retried.
///
/// Once a value is stored it is never replaced, and shared references to it
/// stay valid for as long as the slot lives.
pub struct OnceSlot<T> {
    value: UnsafeCell<MaybeUninit<T>>,
    state: AtomicU8,
    lock: Mutex<()>,
}

// SAFETY: the value is written once, under `lock`, before `COMPUTED` is
// published; afterwards it is only ever shared. Sharing the slot hands out
// `&T` to other threads (needs `Sync`) and the value may be written on one
// thread and dropped on another (needs `Send`).
unsafe impl<T: Send + Sync> Sync for OnceSlot<T> {}

impl<T> OnceSlot<T> {
    /// Creates an empty slot.
    pub const fn new() -> Self {
        Self {
            value: UnsafeCell::new(MaybeUninit::uninit()),
            state: AtomicU8::new(UNINIT),
            lock: Mutex::new(()),
        }
    }

    /// Creates a slot that already holds `value`.
    pub const fn with_value(value: T) -> Self {
        Self {
            value: UnsafeCell::new(MaybeUninit::new(value)),
            state: AtomicU8::new(COMPUTED),
            lock: Mutex::new(()),
        }
    }

    /// Returns the current lifecycle state.
    ///
    /// The answer may be stale by the time the caller looks at it, except for
    /// `Computed`, which is terminal.
    #[inline]
    pub fn state(&self) -> SlotState {
        SlotState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Returns `true` once a value has been published.
    #[inline]
    pub fn is_computed(&self) -> bool {
        self.state.load(Ordering::Acquire) == COMPUTED
    }

    /// Returns the value if it has been published. Never blocks.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        if self.is_computed() {
            // SAFETY: `COMPUTED` was observed with `Acquire`, pairing with the
            // `Release` store made after the value was written.
            Some(unsafe { self.get_unchecked() })
        } else {
            None
        }
    }

    /// Returns a mutable reference to the value if it has been published.
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        if *self.state.get_mut() == COMPUTED {
            // SAFETY: computed, and `&mut self` is exclusive.
            Some(unsafe { self.value.get_mut().assume_init_mut() })
        } else {
            None
        }
    }

    /// Returns the value, running `init` under the slot lock if it is not yet
    /// computed.
    ///
    /// At most one successful `init` ever runs for a slot. Concurrent callers
    /// block while another thread computes. If `init` fails the error is
    /// returned to this caller only and the slot stays empty.
    #[inline]
    pub fn get_or_try_init<E, F>(&self, init: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.get() {
            return Ok(value);
        }
        self.init_slow(init)
    }

    /// Infallible form of [`get_or_try_init`](Self::get_or_try_init).
    #[inline]
    pub fn get_or_init<F>(&self, init: F) -> &T
    where
        F: FnOnce() -> T,
    {
        match self.get_or_try_init(|| Ok::<T, Infallible>(init())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Consumes the slot, returning the value if it was computed.
    pub fn into_inner(self) -> Option<T> {
        // The tag and the lock carry no resources, so skipping `Drop` only
        // skips the value, which is moved out here.
        let mut this = mem::ManuallyDrop::new(self);
        if *this.state.get_mut() == COMPUTED {
            // SAFETY: computed; `this` is never dropped so the value is moved
            // out exactly once.
            Some(unsafe { this.value.get_mut().assume_init_read() })
        } else {
            None
        }
    }

    #[cold]
    fn init_slow<E, F>(&self, init: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let _guard = self.lock.lock();

        // Another thread may have finished while we were waiting.
        if let Some(value) = self.get() {
            return Ok(value);
        }

        self.state.store(COMPUTING, Ordering::Relaxed);
        let reset = ResetOnDrop(&self.state);

        #[cfg(feature = "tracing")]
        tracing::trace!(value = core::any::type_name::<T>(), "computing lazy value");

        let value = init()?;
        mem::forget(reset);

        // SAFETY: we hold the lock and the slot is not `COMPUTED`, so no other
        // reference to the value exists.
        unsafe { (*self.value.get()).write(value) };
        self.state.store(COMPUTED, Ordering::Release);

        #[cfg(feature = "tracing")]
        tracing::trace!(value = core::any::type_name::<T>(), "lazy value published");

        // SAFETY: just published.
        Ok(unsafe { self.get_unchecked() })
    }

    /// # Safety
    ///
    /// The slot must be `COMPUTED`.
    #[inline]
    unsafe fn get_unchecked(&self) -> &T {
        debug_assert!(self.is_computed());
        (*self.value.get()).assume_init_ref()
    }
}

/// Puts the tag back to `Uninit` unless forgotten. Declared after the lock
/// guard so it runs first, while the lock is still held.
struct ResetOnDrop<'a>(&'a AtomicU8);

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(UNINIT, Ordering::Relaxed);
    }
}

impl<T> Default for OnceSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<T> for OnceSlot<T> {
    fn from(value: T) -> Self {
        Self::with_value(value)
    }
}

impl<T> Drop for OnceSlot<T> {
    fn drop(&mut self) {
        if *self.state.get_mut() == COMPUTED {
            // SAFETY: computed and exclusively owned.
            unsafe { self.value.get_mut().assume_init_drop() };
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for OnceSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_tuple("OnceSlot");
        match self.get() {
            Some(value) => d.field(value),
            None => d.field(&format_args!("<uncomputed>")),
        };
        d.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_once_slot_basic() {
        let slot = OnceSlot::new();
        assert_eq!(slot.state(), SlotState::Uninit);
        assert_eq!(slot.get(), None);

        assert_eq!(*slot.get_or_init(|| 42), 42);
        assert_eq!(slot.state(), SlotState::Computed);
        assert_eq!(*slot.get_or_init(|| 100), 42);
        assert_eq!(slot.get(), Some(&42));
    }

    #[test]
    fn test_once_slot_failure_leaves_uninit() {
        let slot: OnceSlot<u32> = OnceSlot::new();
        assert_eq!(slot.get_or_try_init(|| Err("nope")), Err("nope"));
        assert_eq!(slot.state(), SlotState::Uninit);
        assert_eq!(slot.get_or_try_init(|| Ok::<_, &str>(7)), Ok(&7));
    }

    #[test]
    fn test_once_slot_panic_leaves_uninit() {
        let slot: OnceSlot<u32> = OnceSlot::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            slot.get_or_init(|| panic!("compute exploded"));
        }));
        assert!(result.is_err());
        assert_eq!(slot.state(), SlotState::Uninit);
        assert_eq!(*slot.get_or_init(|| 3), 3);
    }

    #[test]
    fn test_once_slot_reports_computing() {
        let slot: OnceSlot<u32> = OnceSlot::new();
        let started = Barrier::new(2);

        thread::scope(|s| {
            s.spawn(|| {
                slot.get_or_init(|| {
                    started.wait();
                    thread::sleep(Duration::from_millis(50));
                    1
                });
            });
            started.wait();
            assert_eq!(slot.state(), SlotState::Computing);
            assert_eq!(slot.get(), None);
        });

        assert_eq!(slot.get(), Some(&1));
    }

    #[test]
    fn test_once_slot_concurrent_single_init() {
        let slot = OnceSlot::new();
        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(16);

        let seen: Vec<usize> = thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let (slot, calls, barrier) = (&slot, &calls, &barrier);
                    s.spawn(move || {
                        barrier.wait();
                        *slot.get_or_init(|| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            i
                        })
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(seen.iter().all(|&v| v == seen[0]));
    }

    #[test]
    fn test_once_slot_into_inner_and_drop() {
        let slot = OnceSlot::with_value(String::from("ready"));
        assert_eq!(slot.into_inner().as_deref(), Some("ready"));

        let empty: OnceSlot<String> = OnceSlot::new();
        assert_eq!(empty.into_inner(), None);

        let drops = AtomicUsize::new(0);
        struct Counted<'a>(&'a AtomicUsize);
        impl Drop for Counted<'_> {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
        {
            let slot = OnceSlot::new();
            slot.get_or_init(|| Counted(&drops));
        }
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_once_slot_get_mut() {
        let mut slot = OnceSlot::new();
        assert!(slot.get_mut().is_none());
        slot.get_or_init(|| vec![1]);
        slot.get_mut().unwrap().push(2);
        assert_eq!(slot.get(), Some(&vec![1, 2]));
    }
}
