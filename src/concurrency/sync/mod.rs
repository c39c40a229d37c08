//! Blocking synchronization used by the lazy primitives.
//!
//! The lock parks on the platform wait-on-address facility: a futex on Linux,
//! `WaitOnAddress` on Windows, and a yield loop everywhere else.

pub mod mutex;

pub use mutex::{Mutex, MutexGuard};

use core::sync::atomic::AtomicU32;
#[cfg(not(windows))]
use core::sync::atomic::Ordering;

#[cfg(windows)]
use windows_sys::Win32::System::Threading::{WaitOnAddress, WakeByAddressSingle};

#[cfg(target_os = "linux")]
use libc::{SYS_futex, FUTEX_PRIVATE_FLAG, FUTEX_WAIT, FUTEX_WAKE};

#[cfg(target_os = "linux")]
#[inline]
fn futex_wait(addr: *const u32, expected: u32) {
    // SAFETY: `addr` points to a live `AtomicU32`; the kernel only reads it.
    unsafe {
        libc::syscall(
            SYS_futex,
            addr,
            FUTEX_WAIT | FUTEX_PRIVATE_FLAG,
            expected,
            core::ptr::null::<libc::timespec>(),
        );
    }
}

#[cfg(target_os = "linux")]
#[inline]
fn futex_wake(addr: *const u32, count: i32) {
    // SAFETY: `addr` points to a live `AtomicU32`.
    unsafe {
        libc::syscall(SYS_futex, addr, FUTEX_WAKE | FUTEX_PRIVATE_FLAG, count);
    }
}

/// Wakes one thread waiting on the given address.
#[inline]
pub fn wake_one_u32(addr: &AtomicU32) {
    #[cfg(windows)]
    unsafe {
        WakeByAddressSingle(addr as *const _ as *mut _);
    }
    #[cfg(target_os = "linux")]
    {
        futex_wake(addr.as_ptr().cast_const(), 1);
    }
    #[cfg(not(any(windows, target_os = "linux")))]
    let _ = addr;
}

/// Waits on the given address while its value equals `expected`.
///
/// May return spuriously; callers re-check their condition in a loop.
#[inline]
pub fn wait_on_u32(addr: &AtomicU32, expected: u32) {
    #[cfg(windows)]
    unsafe {
        let expected_ptr = &expected as *const u32 as *const _;
        let addr_ptr = addr as *const _ as *mut _;
        let size = core::mem::size_of::<u32>();
        WaitOnAddress(addr_ptr, expected_ptr, size, u32::MAX);
    }
    #[cfg(target_os = "linux")]
    {
        if addr.load(Ordering::Acquire) == expected {
            futex_wait(addr.as_ptr().cast_const(), expected);
        }
    }
    #[cfg(not(any(windows, target_os = "linux")))]
    while addr.load(Ordering::Acquire) == expected {
        std::thread::yield_now();
    }
}
