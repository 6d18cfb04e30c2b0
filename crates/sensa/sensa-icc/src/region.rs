use crate::handle::{HandleDescriptor, SharedMemoryHandle};
use crate::shared_buffer::SharedBuffer;
use crate::shm_layout::{BUFFER_OFFSET, RegionHeader, bytes_for_region};
use crate::writer::BufferWriter;
use crate::{Error, Result};
use sensa_events::{ConsumerType, Pod};
use sensa_mmap::MmapFileMut;
use std::mem::size_of;
use std::path::Path;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// The producer side of one consumer type's shared region: the writable
/// mapping plus the owning handle.
///
/// At most one [`BufferWriter`] exists per region at a time; a second
/// `writer()` call fails with [`Error::WriterBusy`] until the first writer
/// is dropped.
pub struct SharedRegion {
    /// Owns the mapping; only accessed through `base` after init.
    _mm: MmapFileMut,
    base: *mut u8,
    handle: SharedMemoryHandle,
    payload_size: usize,
    writer_live: AtomicBool,
}

// SAFETY: the mapping is process-wide; writes go through the single
// BufferWriter and the seqlock, header bytes are immutable after `create`.
unsafe impl Send for SharedRegion {}
unsafe impl Sync for SharedRegion {}

impl SharedRegion {
    /// Creates a fresh, zeroed region for payload `T` at `path`, replacing
    /// any stale file left there.
    pub fn create<T: Pod>(path: impl AsRef<Path>, consumer: ConsumerType) -> Result<Arc<Self>> {
        let path = path.as_ref();
        let bytes = bytes_for_region::<T>();
        let mut mm = MmapFileMut::create_rw(path, bytes as u64).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = mm.as_mut_ptr();

        // SAFETY: the mapping was just created by us, is `bytes` long and
        // page aligned, which satisfies the header and the 64-byte buffer.
        unsafe {
            ptr::write(base as *mut RegionHeader, RegionHeader::new::<T>(consumer));
            ptr::write(
                base.add(BUFFER_OFFSET) as *mut SharedBuffer<T>,
                SharedBuffer::zeroed(),
            );
        }

        let handle = SharedMemoryHandle::owning(HandleDescriptor {
            path: path.to_path_buf(),
            size: bytes as u64,
            consumer_type: consumer,
        });
        debug!(%consumer, path = %path.display(), bytes, "created shared region");

        Ok(Arc::new(Self {
            _mm: mm,
            base,
            handle,
            payload_size: size_of::<T>(),
            writer_live: AtomicBool::new(false),
        }))
    }

    /// A new clone of the owning handle.
    pub fn handle(&self) -> SharedMemoryHandle {
        self.handle.clone()
    }

    pub fn consumer_type(&self) -> ConsumerType {
        self.handle.consumer_type()
    }

    pub fn path(&self) -> &Path {
        self.handle.path()
    }

    pub fn len(&self) -> usize {
        self.handle.size() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_writer(&self) -> bool {
        self.writer_live.load(Ordering::Acquire)
    }

    /// Takes the region's single writer.
    pub fn writer<T: Pod>(self: &Arc<Self>) -> Result<BufferWriter<T>> {
        if self.payload_size != size_of::<T>() {
            return Err(Error::PayloadMismatch {
                region: self.payload_size,
                requested: size_of::<T>(),
            });
        }
        if self.writer_live.swap(true, Ordering::AcqRel) {
            return Err(Error::WriterBusy {
                path: self.path().to_path_buf(),
            });
        }
        let buffer = self.base.wrapping_add(BUFFER_OFFSET) as *const SharedBuffer<T>;
        Ok(BufferWriter::new(Arc::clone(self), buffer))
    }

    pub(crate) fn release_writer(&self) {
        self.writer_live.store(false, Ordering::Release);
    }
}
