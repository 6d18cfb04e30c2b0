use crate::buffer::DeviceBuffer;
use crate::error::ProducerError;
use sensa_events::{ConsumerMask, ConsumerType};
use std::time::Duration;

/// Sampling period used when a producer does not pick its own: 60 Hz.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_micros(1_000_000 / 60);

/// Where a producer's `start`/`stop`/`fetch` calls run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadingMode {
    /// `start`/`stop` run on the manager's thread; the producer pushes
    /// updates on its own schedule (OS callbacks). No polling thread.
    Inline,
    /// `start`/`stop`/`fetch` all run on the polling thread; `fetch` is
    /// called every `poll_interval` while any stream is active.
    PollingCallback,
    /// `start`/`stop` run on the polling thread but `fetch` is never
    /// scheduled; the producer has its own notification source and only
    /// wants registration serialized on a stable background thread.
    SeparateThreadNoCallback,
}

impl ThreadingMode {
    #[inline]
    pub fn uses_polling_thread(self) -> bool {
        !matches!(self, ThreadingMode::Inline)
    }
}

/// A sensor backend that writes readings into the shared buffers.
///
/// All calls for one producer happen on a single thread at a time (the
/// manager's thread in [`ThreadingMode::Inline`], the polling thread
/// otherwise), so implementations need no internal locking.
pub trait DataProducer: Send {
    /// Begin producing `consumer` readings into `buffer`. The buffer is the
    /// stream's only writer; keep it until `stop` and drop it there.
    fn start(&mut self, consumer: ConsumerType, buffer: DeviceBuffer) -> Result<(), ProducerError>;

    /// Stop producing `consumer` readings and release its buffer.
    fn stop(&mut self, consumer: ConsumerType) -> Result<(), ProducerError>;

    /// One polling tick: refresh the buffers of every type in `active`.
    /// Only called in [`ThreadingMode::PollingCallback`].
    fn fetch(&mut self, _active: ConsumerMask) {}

    fn mode(&self) -> ThreadingMode {
        ThreadingMode::Inline
    }

    fn poll_interval(&self) -> Duration {
        DEFAULT_POLL_INTERVAL
    }
}

impl<P: DataProducer + ?Sized> DataProducer for Box<P> {
    fn start(&mut self, consumer: ConsumerType, buffer: DeviceBuffer) -> Result<(), ProducerError> {
        (**self).start(consumer, buffer)
    }

    fn stop(&mut self, consumer: ConsumerType) -> Result<(), ProducerError> {
        (**self).stop(consumer)
    }

    fn fetch(&mut self, active: ConsumerMask) {
        (**self).fetch(active)
    }

    fn mode(&self) -> ThreadingMode {
        (**self).mode()
    }

    fn poll_interval(&self) -> Duration {
        (**self).poll_interval()
    }
}
