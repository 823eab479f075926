//! Cross-process wait/wake on a 32-bit word.
//!
//! On Linux this is the futex syscall without `FUTEX_PRIVATE_FLAG`, so the
//! word may live in a `MAP_SHARED` mapping and waiters in another process
//! are woken. Other Unix platforms get a sleep-poll fallback with the same
//! contract and coarser wakeup latency.
//!
//! Both functions may return spuriously; callers re-check their predicate in
//! a loop.

use core::sync::atomic::AtomicU32;
use core::time::Duration;

/// Block until the value at `word` is observed to differ from `expected`,
/// a wake arrives, or `timeout` expires.
///
/// Returns immediately if `*word != expected` at call time.
#[cfg(target_os = "linux")]
pub fn futex_wait(word: &AtomicU32, expected: u32, timeout: Option<Duration>) {
    let ts = timeout.map(|t| libc::timespec {
        tv_sec: t.as_secs().min(i64::MAX as u64) as libc::time_t,
        tv_nsec: t.subsec_nanos() as libc::c_long,
    });
    let ts_ptr = ts
        .as_ref()
        .map_or(core::ptr::null(), |ts| ts as *const libc::timespec);

    // EAGAIN (value changed), EINTR, and ETIMEDOUT all mean "re-check".
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            word.as_ptr(),
            libc::FUTEX_WAIT,
            expected,
            ts_ptr,
        );
    }
}

/// Wake up to `waiters` threads blocked in [`futex_wait`] on `word`.
#[cfg(target_os = "linux")]
pub fn futex_wake(word: &AtomicU32, waiters: u32) {
    let n = waiters.min(i32::MAX as u32) as libc::c_int;
    unsafe {
        libc::syscall(libc::SYS_futex, word.as_ptr(), libc::FUTEX_WAKE, n);
    }
}

#[cfg(not(target_os = "linux"))]
mod fallback {
    use super::*;
    use core::sync::atomic::Ordering;
    use std::time::Instant;

    const POLL_INTERVAL: Duration = Duration::from_micros(200);

    pub fn futex_wait(word: &AtomicU32, expected: u32, timeout: Option<Duration>) {
        let deadline = timeout.map(|t| Instant::now() + t);
        while word.load(Ordering::Acquire) == expected {
            let mut nap = POLL_INTERVAL;
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    return;
                }
                nap = nap.min(deadline - now);
            }
            std::thread::sleep(nap);
        }
    }

    /// Wakes nobody directly; pollers notice the store on their next probe.
    pub fn futex_wake(_word: &AtomicU32, _waiters: u32) {}
}

#[cfg(not(target_os = "linux"))]
pub use fallback::{futex_wait, futex_wake};
