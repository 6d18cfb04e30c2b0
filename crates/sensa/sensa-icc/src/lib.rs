mod error;
mod handle;
mod reader;
mod region;
mod seqlock;
mod shared_buffer;
mod shm_layout;
mod writer;

pub use error::{Error, Result};
pub use handle::{HandleDescriptor, SharedMemoryHandle};
pub use reader::{MAX_READ_ATTEMPTS, Reader};
pub use region::SharedRegion;
pub use seqlock::SeqLock;
pub use shared_buffer::SharedBuffer;
pub use shm_layout::{BUFFER_OFFSET, REGION_MAGIC, REGION_VERSION, RegionHeader, bytes_for_region};
pub use writer::BufferWriter;
