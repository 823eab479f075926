//! Auto-reset event over a single shared futex word.
//!
//! The word holds `0` (unsignalled) or `1` (signalled). A signal releases
//! exactly one waiter: the waiter consumes the word with a CAS back to `0`,
//! so a signal that arrives with nobody waiting is absorbed by the next wait.
//! A third value, `2`, is a "poke": it wakes waiters without granting them a
//! signal, which lets a disposer push its own thread through a cancellation
//! re-check. A real signal overwrites a pending poke.

use core::ptr::NonNull;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::futex::{futex_wait, futex_wake};

const UNSET: u32 = 0;
const SET: u32 = 1;
const POKED: u32 = 2;

/// Outcome of [`Event::wait_or_cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The event was signalled and this waiter consumed the signal.
    Signalled,
    /// The cancel flag was observed set; the event was not consumed.
    Cancelled,
}

/// An auto-reset cross-process event.
///
/// The state word usually lives in a `MAP_SHARED` mapping so that the peer
/// process's `Event` view of the same word can signal or wait on it.
pub struct Event {
    word: NonNull<AtomicU32>,
}

// Safety: all access to the word goes through atomics; the futex syscall
// itself is process- and thread-safe.
unsafe impl Send for Event {}
unsafe impl Sync for Event {}

impl Event {
    /// Create an event view over an existing state word.
    ///
    /// # Safety
    ///
    /// - `word` must point to a 4-byte-aligned `u32` that remains mapped for
    ///   the lifetime of this `Event`
    /// - every party touching the word must do so through an `Event`
    pub unsafe fn from_raw(word: NonNull<AtomicU32>) -> Self {
        Self { word }
    }

    #[inline]
    fn word(&self) -> &AtomicU32 {
        unsafe { self.word.as_ref() }
    }

    /// Signal the event, releasing one waiter (now or later).
    ///
    /// Consecutive signals with no wait in between coalesce into one.
    pub fn signal(&self) {
        if self.word().swap(SET, Ordering::Release) != SET {
            futex_wake(self.word(), 1);
        }
    }

    /// Block until the event is signalled, then consume the signal.
    pub fn wait(&self) {
        loop {
            match self
                .word()
                .compare_exchange(SET, UNSET, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return,
                Err(seen) => futex_wait(self.word(), seen, None),
            }
        }
    }

    /// Block until the event is signalled or `cancel` is observed set.
    ///
    /// On [`WaitOutcome::Cancelled`] the event state is left untouched; a
    /// signal that raced the cancellation stays consumable.
    pub fn wait_or_cancel(&self, cancel: &AtomicBool) -> WaitOutcome {
        loop {
            if cancel.load(Ordering::Acquire) {
                return WaitOutcome::Cancelled;
            }
            match self
                .word()
                .compare_exchange(SET, UNSET, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return WaitOutcome::Signalled,
                Err(seen) => futex_wait(self.word(), seen, None),
            }
        }
    }

    /// Wake all waiters without signalling the event.
    ///
    /// Call after setting the cancel flag passed to [`Event::wait_or_cancel`];
    /// the woken waiters re-check the flag and return `Cancelled`. If the
    /// event is already signalled the wake alone suffices, so the poke value
    /// is only installed over an unsignalled word.
    pub fn poke(&self) {
        let _ = self
            .word()
            .compare_exchange(UNSET, POKED, Ordering::AcqRel, Ordering::Relaxed);
        futex_wake(self.word(), u32::MAX);
    }
}
