//! Consumer side: a read-only mapping of a region plus bounded-retry reads.

use crate::handle::SharedMemoryHandle;
use crate::shared_buffer::SharedBuffer;
use crate::shm_layout::{BUFFER_OFFSET, RegionHeader, bytes_for_region};
use crate::{Error, Result};
use sensa_events::{ConsumerType, Pod};
use sensa_mmap::MmapFile;
use std::marker::PhantomData;
use tracing::{debug, trace};

/// Default bound on read attempts per [`Reader::latest`] call.
pub const MAX_READ_ATTEMPTS: usize = 10;

/// Reads the latest payload a producer published into a shared region.
///
/// A reader that failed to attach does not exist, so a stale or invalid
/// handle leaves the consumer to request a fresh one.
///
/// `Send` but not `Sync`: several threads may share one reader only if they
/// serialize their calls themselves.
pub struct Reader<T: Pod> {
    /// Owns the read-only mapping.
    _mm: MmapFile,
    /// Keeps an in-process region alive while we are mapped.
    handle: SharedMemoryHandle,
    buffer: *const SharedBuffer<T>,
    consumer: ConsumerType,
    retry_limit: usize,
    contention_misses: u64,
    _pd: PhantomData<T>,
}

// SAFETY: the mapping is read-only and process-wide; all access goes
// through the seqlock read protocol.
unsafe impl<T: Pod> Send for Reader<T> {}

impl<T: Pod> Reader<T> {
    /// Maps the region named by `handle` read-only and validates its header
    /// against `T`.
    ///
    /// # Errors
    /// - [`Error::InvalidHandle`] if the backing file is gone or resized
    /// - [`Error::Layout`] if the region is too small or was not written for `T`
    /// - [`Error::Io`] if the mapping itself fails
    pub fn attach(handle: &SharedMemoryHandle) -> Result<Self> {
        let path = handle.path().to_path_buf();
        if !handle.is_valid() {
            return Err(Error::InvalidHandle { path });
        }

        let bytes = bytes_for_region::<T>();
        if (handle.size() as usize) < bytes {
            return Err(Error::Layout {
                path,
                reason: "region smaller than the shared buffer",
            });
        }

        let mm = MmapFile::open_ro_len(&path, bytes).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        let base = mm.as_ptr();

        // SAFETY: the mapping is at least `bytes` long and page aligned.
        let header = unsafe { &*(base as *const RegionHeader) };
        let consumer = header
            .validate::<T>()
            .map_err(|reason| Error::Layout {
                path: path.clone(),
                reason,
            })?;
        if consumer != handle.consumer_type() {
            return Err(Error::Layout {
                path,
                reason: "consumer type differs from handle",
            });
        }

        debug!(%consumer, path = %path.display(), "attached reader");

        Ok(Self {
            _mm: mm,
            handle: handle.clone(),
            buffer: base.wrapping_add(BUFFER_OFFSET) as *const SharedBuffer<T>,
            consumer,
            retry_limit: MAX_READ_ATTEMPTS,
            contention_misses: 0,
            _pd: PhantomData,
        })
    }

    /// Overrides the per-call attempt bound (at least one attempt is made).
    pub fn with_retry_limit(mut self, attempts: usize) -> Self {
        self.retry_limit = attempts.max(1);
        self
    }

    #[inline(always)]
    fn buffer(&self) -> &SharedBuffer<T> {
        // SAFETY: validated to lie within the mapping in `attach`.
        unsafe { &*self.buffer }
    }

    /// Returns a copy of the latest complete update, or `None` if every
    /// attempt overlapped a write. `None` means "no new data this time",
    /// not a failure of the stream; keep the previous value.
    #[inline]
    pub fn latest(&mut self) -> Option<T> {
        let buffer = self.buffer();
        for _ in 0..self.retry_limit {
            if let Some(value) = buffer.try_read() {
                return Some(value);
            }
            std::hint::spin_loop();
        }

        self.contention_misses += 1;
        trace!(consumer = %self.consumer, attempts = self.retry_limit, "read gave up under contention");
        None
    }

    /// Writes the latest complete update into `out` and returns true, or
    /// returns false and leaves `out` untouched.
    pub fn read_into(&mut self, out: &mut T) -> bool {
        match self.latest() {
            Some(value) => {
                *out = value;
                true
            }
            None => false,
        }
    }

    pub fn consumer_type(&self) -> ConsumerType {
        self.consumer
    }

    pub fn handle(&self) -> &SharedMemoryHandle {
        &self.handle
    }

    pub fn retry_limit(&self) -> usize {
        self.retry_limit
    }

    /// Number of `latest` calls that ran out of attempts.
    pub fn contention_misses(&self) -> u64 {
        self.contention_misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SharedRegion;
    use crate::handle::HandleDescriptor;
    use sensa_events::{LightData, MotionData, OrientationData};
    use std::sync::Arc;

    fn light_region(dir: &tempfile::TempDir) -> Arc<SharedRegion> {
        SharedRegion::create::<LightData>(dir.path().join("light"), ConsumerType::Light).unwrap()
    }

    #[test]
    fn reads_latest_write() {
        let dir = tempfile::tempdir().unwrap();
        let region = light_region(&dir);
        let mut w = region.writer::<LightData>().unwrap();
        let mut r = Reader::<LightData>::attach(&region.handle()).unwrap();

        assert_eq!(r.latest(), Some(LightData { lux: 0.0 }));
        w.write(LightData { lux: 300.0 });
        w.write(LightData { lux: 310.0 });
        assert_eq!(r.latest(), Some(LightData { lux: 310.0 }));
        assert_eq!(r.consumer_type(), ConsumerType::Light);
    }

    #[test]
    fn gives_up_after_bounded_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let region = light_region(&dir);
        let mut w = region.writer::<LightData>().unwrap();
        w.write(LightData { lux: 42.0 });

        let mut r = Reader::<LightData>::attach(&region.handle()).unwrap();
        // A writer stalled mid-update: leave the version odd.
        let stalled = w.buffer();
        stalled.seqlock().write_begin();

        let mut out = LightData { lux: -1.0 };
        assert!(!r.read_into(&mut out));
        assert_eq!(out.lux, -1.0, "failed read must not touch the output");
        assert_eq!(r.latest(), None);
        assert_eq!(r.contention_misses(), 2);

        stalled.seqlock().write_end();
        assert!(r.read_into(&mut out));
        assert_eq!(out.lux, 42.0);
    }

    #[test]
    fn retry_limit_is_at_least_one() {
        let dir = tempfile::tempdir().unwrap();
        let region = light_region(&dir);
        let r = Reader::<LightData>::attach(&region.handle())
            .unwrap()
            .with_retry_limit(0);
        assert_eq!(r.retry_limit(), 1);
    }

    #[test]
    fn attach_rejects_wrong_payload_type() {
        let dir = tempfile::tempdir().unwrap();
        let region = light_region(&dir);
        let err = Reader::<MotionData>::attach(&region.handle()).err().unwrap();
        assert!(matches!(err, Error::Layout { .. }), "{err}");
    }

    #[test]
    fn attach_rejects_consumer_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let region = SharedRegion::create::<OrientationData>(
            dir.path().join("orientation"),
            ConsumerType::Orientation,
        )
        .unwrap();
        let mut desc = region.handle().descriptor();
        desc.consumer_type = ConsumerType::OrientationAbsolute;
        let err = Reader::<OrientationData>::attach(&SharedMemoryHandle::from_descriptor(desc))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Layout { reason: "consumer type differs from handle", .. }));
    }

    #[test]
    fn attach_rejects_stale_handle() {
        let dir = tempfile::tempdir().unwrap();
        let desc = {
            let region = light_region(&dir);
            region.handle().descriptor()
        };
        // Owner is gone and removed the file.
        let stale = SharedMemoryHandle::from_descriptor(desc);
        assert!(matches!(
            Reader::<LightData>::attach(&stale),
            Err(Error::InvalidHandle { .. })
        ));
    }

    #[test]
    fn attach_rejects_foreign_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage");
        let size = bytes_for_region::<LightData>();
        std::fs::write(&path, vec![0x5Au8; size]).unwrap();
        let handle = SharedMemoryHandle::from_descriptor(HandleDescriptor {
            path,
            size: size as u64,
            consumer_type: ConsumerType::Light,
        });
        assert!(matches!(
            Reader::<LightData>::attach(&handle),
            Err(Error::Layout { reason: "bad magic", .. })
        ));
    }

    #[test]
    fn reader_keeps_in_process_region_alive() {
        let dir = tempfile::tempdir().unwrap();
        let region = light_region(&dir);
        let path = region.path().to_path_buf();
        let mut r = Reader::<LightData>::attach(&region.handle()).unwrap();
        drop(region);
        assert!(path.exists());
        assert!(r.latest().is_some());
        drop(r);
        assert!(!path.exists());
    }
}
