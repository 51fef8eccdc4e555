//! Reader/writer spinlock packed into a 16-bit word
//!
//! ```text
//! bit 15      : held exclusively
//! bit 14      : a writer is waiting, new readers back off
//! bits 0..=13 : number of shared holders
//! ```
//!
//! Never parks the thread; waiting is done with exponential backoff.

use crossbeam::utils::Backoff;
use std::sync::atomic::{AtomicU16, Ordering};

const EXCLUSIVE: u16 = 0x8000;
const WRITER_PENDING: u16 = 0x4000;
const READERS: u16 = 0x3FFF;

#[derive(Debug, Default)]
#[repr(transparent)]
pub struct RwSpinLock(AtomicU16);

impl RwSpinLock {
    pub const fn new() -> Self {
        RwSpinLock(AtomicU16::new(0))
    }

    /// Take shared access without waiting
    pub fn try_acquire_shared(&self) -> bool {
        let state = self.0.load(Ordering::Relaxed);
        if state & (EXCLUSIVE | WRITER_PENDING) != 0 || state & READERS == READERS {
            return false;
        }
        self.0
            .compare_exchange(state, state + 1, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    pub fn acquire_shared(&self) {
        let backoff = Backoff::new();
        while !self.try_acquire_shared() {
            if backoff.is_completed() {
                tracing::trace!(state = self.state(), "contended shared cell lock");
            }
            backoff.snooze();
        }
    }

    pub fn release_shared(&self) {
        self.0.fetch_sub(1, Ordering::Release);
    }

    /// Take exclusive access without waiting
    pub fn try_acquire(&self) -> bool {
        let state = self.0.load(Ordering::Relaxed);
        state & !WRITER_PENDING == 0
            && self
                .0
                .compare_exchange(state, EXCLUSIVE, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
    }

    pub fn acquire(&self) {
        let backoff = Backoff::new();
        loop {
            let state = self.0.load(Ordering::Relaxed);
            if state & !WRITER_PENDING == 0 {
                if self
                    .0
                    .compare_exchange_weak(state, EXCLUSIVE, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
                {
                    return;
                }
            } else if state & WRITER_PENDING == 0 {
                // keep new readers out while the current ones drain
                self.0.fetch_or(WRITER_PENDING, Ordering::Relaxed);
            }
            if backoff.is_completed() {
                tracing::trace!(state, "contended exclusive cell lock");
            }
            backoff.snooze();
        }
    }

    /// Release exclusive access; a pending bit set by another writer survives
    pub fn release(&self) {
        self.0.fetch_and(!EXCLUSIVE, Ordering::Release);
    }

    pub fn read(&self) -> SharedGuard<'_> {
        self.acquire_shared();
        SharedGuard(self)
    }

    pub fn try_read(&self) -> Option<SharedGuard<'_>> {
        self.try_acquire_shared().then(|| SharedGuard(self))
    }

    pub fn is_exclusive(&self) -> bool {
        self.state() & EXCLUSIVE != 0
    }

    pub fn readers(&self) -> u16 {
        self.state() & READERS
    }

    pub fn state(&self) -> u16 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Shared access held until dropped
pub struct SharedGuard<'a>(&'a RwSpinLock);

impl Drop for SharedGuard<'_> {
    fn drop(&mut self) {
        self.0.release_shared();
    }
}
