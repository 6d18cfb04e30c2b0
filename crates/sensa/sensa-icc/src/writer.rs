use crate::handle::SharedMemoryHandle;
use crate::region::SharedRegion;
use crate::shared_buffer::SharedBuffer;
use sensa_events::{ConsumerType, Pod};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// The one writable view of a region's `SharedBuffer<T>`.
///
/// Obtained from [`SharedRegion::writer`]. It is `Send` so it can be handed
/// to whichever thread drives the producer, but not `Clone` or `Sync`: having
/// a `&mut BufferWriter` is what makes the single-writer rule hold. The
/// mapping stays alive for as long as the writer does.
pub struct BufferWriter<T: Pod> {
    region: Arc<SharedRegion>,
    buffer: *const SharedBuffer<T>,
    _pd: PhantomData<T>,
}

// SAFETY: the buffer lives in a shared mapping kept alive by `region`, and
// only this writer stores to it.
unsafe impl<T: Pod> Send for BufferWriter<T> {}

impl<T: Pod> BufferWriter<T> {
    pub(crate) fn new(region: Arc<SharedRegion>, buffer: *const SharedBuffer<T>) -> Self {
        Self {
            region,
            buffer,
            _pd: PhantomData,
        }
    }

    #[inline(always)]
    pub(crate) fn buffer(&self) -> &SharedBuffer<T> {
        // SAFETY: points into the mapping owned by `self.region`.
        unsafe { &*self.buffer }
    }

    /// Publishes `value` as one update.
    #[inline(always)]
    pub fn write(&mut self, value: T) {
        // SAFETY: `&mut self` on the region's only writer.
        unsafe { self.buffer().write(value) }
    }

    /// Modifies the current payload in place and publishes it as one update.
    #[inline]
    pub fn update<F: FnOnce(&mut T)>(&mut self, f: F) {
        // SAFETY: as in `write`.
        unsafe { self.buffer().update(f) }
    }

    /// Publishes an all-zero payload.
    pub fn reset(&mut self) {
        // SAFETY: as in `write`.
        unsafe { self.buffer().reset() }
    }

    /// The payload as last written by this writer.
    pub fn current(&self) -> T {
        // No concurrent writer exists, so this copy cannot be torn.
        self.buffer().copy_payload()
    }

    pub fn version(&self) -> u64 {
        self.buffer().seqlock().version()
    }

    pub fn consumer_type(&self) -> ConsumerType {
        self.region.consumer_type()
    }

    pub fn handle(&self) -> SharedMemoryHandle {
        self.region.handle()
    }
}

impl<T: Pod> Drop for BufferWriter<T> {
    fn drop(&mut self) {
        self.region.release_writer();
    }
}

impl<T: Pod> fmt::Debug for BufferWriter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferWriter")
            .field("consumer_type", &self.consumer_type())
            .field("version", &self.version())
            .finish()
    }
}
