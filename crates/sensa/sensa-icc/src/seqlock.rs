//! Sequence lock for one writer and any number of lock-free readers.
//!
//! The lock is a single version counter. The writer bumps it to odd before
//! touching the protected data and back to even afterwards; a reader samples
//! the counter before and after copying the data and throws the copy away if
//! the two samples differ or the first one was odd.
//!
//! # Protocol
//!
//! **Writer:**
//! 1. `write_begin()`: version even → odd
//! 2. Write data
//! 3. `write_end()`: version odd → even
//!
//! **Reader:**
//! 1. `v = read_begin()`
//! 2. Copy data
//! 3. `read_retry(v)`; if true the copy may be torn, discard it
//!
//! Nothing here blocks. The writer is never slowed by readers, and readers
//! decide themselves how many times to retry.
//!
//! Exactly one writer may use a given lock at a time. The lock cannot detect
//! a second writer; whoever hands out write access has to guarantee it.

use std::sync::atomic::{AtomicU64, Ordering, fence};

/// Version counter. Lives inside shared memory, so it is `#[repr(C)]` and
/// starts life as zeroed bytes (version 0, no write in progress).
#[repr(C)]
#[derive(Debug, Default)]
pub struct SeqLock {
    /// Even = stable, odd = write in progress.
    version: AtomicU64,
}

impl SeqLock {
    pub const fn new() -> Self {
        Self {
            version: AtomicU64::new(0),
        }
    }

    /// Samples the version before a read. An odd value means a write is in
    /// progress; [`read_retry`](Self::read_retry) will then always ask for a
    /// retry.
    #[inline(always)]
    pub fn read_begin(&self) -> u64 {
        // Acquire pairs with the Release in write_end: every data store of
        // the write that produced this version is visible to the copy.
        self.version.load(Ordering::Acquire)
    }

    /// Returns true if the data copied since `read_begin` returned `version`
    /// cannot be trusted: a write was already in progress, or one started
    /// during the copy.
    #[inline(always)]
    pub fn read_retry(&self, version: u64) -> bool {
        // Keeps the data loads of the copy from sinking below this load.
        fence(Ordering::Acquire);
        let current = self.version.load(Ordering::Relaxed);
        (version & 1) != 0 || current != version
    }

    /// Marks a write as in progress (even → odd).
    #[inline(always)]
    pub fn write_begin(&self) {
        let prev = self.version.fetch_add(1, Ordering::Relaxed);
        debug_assert!(prev & 1 == 0, "write_begin while a write is in progress");
        // Keeps the data stores that follow from being hoisted above the
        // odd version.
        fence(Ordering::Release);
    }

    /// Publishes the write (odd → even).
    #[inline(always)]
    pub fn write_end(&self) {
        let prev = self.version.fetch_add(1, Ordering::Release);
        debug_assert!(prev & 1 == 1, "write_end without write_begin");
    }

    /// Current raw version, without read-side ordering. Diagnostics only.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_even_and_stable() {
        let lock = SeqLock::new();
        let v = lock.read_begin();
        assert_eq!(v, 0);
        assert!(!lock.read_retry(v));
    }

    #[test]
    fn write_moves_version_by_two() {
        let lock = SeqLock::new();
        lock.write_begin();
        assert_eq!(lock.version(), 1);
        lock.write_end();
        assert_eq!(lock.version(), 2);
    }

    #[test]
    fn odd_version_always_retries() {
        let lock = SeqLock::new();
        lock.write_begin();
        let v = lock.read_begin();
        assert_eq!(v & 1, 1);
        // Counter has not moved since, but the sample itself was odd.
        assert!(lock.read_retry(v));
        lock.write_end();
    }

    #[test]
    fn write_during_read_retries() {
        let lock = SeqLock::new();
        let v = lock.read_begin();
        lock.write_begin();
        lock.write_end();
        assert!(lock.read_retry(v));

        let v = lock.read_begin();
        assert!(!lock.read_retry(v));
    }

    #[test]
    fn zeroed_bytes_are_a_valid_lock() {
        let lock: SeqLock = unsafe { std::mem::zeroed() };
        assert_eq!(lock.read_begin(), 0);
    }
}
