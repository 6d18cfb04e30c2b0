//! Producer-side lifecycle of the shared sensor buffers.
//!
//! A [`ConsumerLifecycleManager`] owns one shared region per consumer type
//! and a [`DataProducer`] (an OS sensor backend). Consumers start and stop
//! streams by type. A region is zeroed before the producer gets its writer;
//! producer calls run inline or on a dedicated polling thread, which also
//! drives `fetch` while a polled stream is active.

mod buffer;
mod directory;
mod error;
mod manager;
mod polling;
mod producer;

pub use buffer::{DeviceBuffer, allocate_region};
pub use directory::RegionDirectory;
pub use error::{FetchError, ProducerError, Result};
pub use manager::{ConsumerLifecycleManager, FetcherConfig, ProcessId, default_shm_dir};
pub use producer::{DEFAULT_POLL_INTERVAL, DataProducer, ThreadingMode};
