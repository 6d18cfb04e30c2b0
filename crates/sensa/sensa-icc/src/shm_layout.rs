//! Layout of one consumer type's shared region.
//!
//! # Memory Layout
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        RegionHeader (offset 0)                 │
//! │  ┌──────────┬──────────┬──────────┬──────────────┬──────────┐  │
//! │  │  magic   │ version  │ consumer │ payload_size │  offset  │  │
//! │  │  (8B)    │  (4B)    │  (4B)    │  (8B)        │  (8B)    │  │
//! │  └──────────┴──────────┴──────────┴──────────────┴──────────┘  │
//! ├──────────────────────── BUFFER_OFFSET (64) ────────────────────┤
//! │                     SharedBuffer<T>                            │
//! │  ┌──────────────────┬─────────────────────────────────────┐    │
//! │  │  seqlock (8B)    │  data: T                            │    │
//! │  └──────────────────┴─────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The header is written once when the region is created and never changes,
//! so readers can validate it without synchronization.

use crate::shared_buffer::SharedBuffer;
use sensa_events::{ConsumerType, Pod};
use std::mem::size_of;

/// ASCII "SENSASHM".
pub const REGION_MAGIC: u64 = 0x5345_4E53_4153_484D;

/// Bump on any incompatible change to the layout above.
pub const REGION_VERSION: u32 = 1;

/// Fixed offset of the `SharedBuffer<T>` from the start of the region.
pub const BUFFER_OFFSET: usize = 64;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RegionHeader {
    pub magic: u64,
    pub version: u32,
    /// `ConsumerType` bit of the stream this region carries.
    pub consumer_type: u32,
    /// `size_of::<T>()` of the payload.
    pub payload_size: u64,
    pub buffer_offset: u64,
}

const _: () = assert!(size_of::<RegionHeader>() <= BUFFER_OFFSET);

impl RegionHeader {
    pub fn new<T: Pod>(consumer: ConsumerType) -> Self {
        Self {
            magic: REGION_MAGIC,
            version: REGION_VERSION,
            consumer_type: consumer.bit(),
            payload_size: size_of::<T>() as u64,
            buffer_offset: BUFFER_OFFSET as u64,
        }
    }

    /// Checks a mapped header against the payload type the caller expects.
    pub fn validate<T: Pod>(&self) -> Result<ConsumerType, &'static str> {
        if self.magic != REGION_MAGIC {
            return Err("bad magic");
        }
        if self.version != REGION_VERSION {
            return Err("wrong layout version");
        }
        if self.buffer_offset != BUFFER_OFFSET as u64 {
            return Err("unexpected buffer offset");
        }
        if self.payload_size as usize != size_of::<T>() {
            return Err("payload size mismatch");
        }
        ConsumerType::from_bit(self.consumer_type).ok_or("unknown consumer type")
    }
}

/// Total bytes a region carrying `T` needs.
pub const fn bytes_for_region<T: Pod>() -> usize {
    BUFFER_OFFSET + size_of::<SharedBuffer<T>>()
}
