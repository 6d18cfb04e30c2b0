//! A payload guarded by a [`SeqLock`]: the record placed in shared memory.
//!
//! # Memory Layout
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  seqlock: SeqLock  │  data: T           │
//! │  (8 bytes)         │  (size_of::<T>)    │
//! └─────────────────────────────────────────┘
//! ```

use crate::seqlock::SeqLock;
use sensa_events::Pod;
use std::cell::UnsafeCell;
use std::ptr;

#[repr(C, align(64))]
pub struct SharedBuffer<T: Pod> {
    seqlock: SeqLock,
    data: UnsafeCell<T>,
}

// SAFETY: readers only copy `data` under the seqlock protocol and discard
// copies that raced with the writer; `Pod` makes every such copy a valid `T`.
unsafe impl<T: Pod> Sync for SharedBuffer<T> {}

impl<T: Pod> SharedBuffer<T> {
    pub fn new(value: T) -> Self {
        Self {
            seqlock: SeqLock::new(),
            data: UnsafeCell::new(value),
        }
    }

    pub fn zeroed() -> Self {
        Self::new(T::zeroed())
    }

    #[inline(always)]
    pub fn seqlock(&self) -> &SeqLock {
        &self.seqlock
    }

    /// Byte-wise copy of the payload, with no consistency guarantee on its
    /// own. Only meaningful between `read_begin` and `read_retry`.
    #[inline(always)]
    pub fn copy_payload(&self) -> T {
        // SAFETY: the pointer is valid for the lifetime of `self`; a racing
        // write can only produce another valid `T` because `T: Pod`.
        unsafe { ptr::read_volatile(self.data.get()) }
    }

    /// One read attempt: `None` if the copy may be torn.
    #[inline]
    pub fn try_read(&self) -> Option<T> {
        let version = self.seqlock.read_begin();
        let value = self.copy_payload();
        if self.seqlock.read_retry(version) {
            None
        } else {
            Some(value)
        }
    }

    /// Publishes `value`.
    ///
    /// # Safety
    /// The caller must be the only writer of this buffer for the duration of
    /// the call.
    #[inline(always)]
    pub unsafe fn write(&self, value: T) {
        self.seqlock.write_begin();
        unsafe { ptr::write_volatile(self.data.get(), value) };
        self.seqlock.write_end();
    }

    /// Applies `f` to the current payload and publishes the result as one
    /// update.
    ///
    /// # Safety
    /// Same single-writer requirement as [`write`](Self::write).
    #[inline]
    pub unsafe fn update<F: FnOnce(&mut T)>(&self, f: F) {
        // No other writer exists, so this copy cannot be torn.
        let mut value = unsafe { ptr::read_volatile(self.data.get()) };
        f(&mut value);
        unsafe { self.write(value) };
    }

    /// Publishes an all-zero payload.
    ///
    /// # Safety
    /// Same single-writer requirement as [`write`](Self::write).
    #[inline]
    pub unsafe fn reset(&self) {
        unsafe { self.write(T::zeroed()) };
    }
}
