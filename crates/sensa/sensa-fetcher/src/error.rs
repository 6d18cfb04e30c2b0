use sensa_events::ConsumerType;
use std::io;

/// Why a producer could not start or stop a stream.
#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    #[error("{0} sensor is not available on this device")]
    Unavailable(ConsumerType),

    #[error("{0} is not supported by this producer")]
    Unsupported(ConsumerType),

    #[error("shared buffer error")]
    Buffer(#[from] sensa_icc::Error),

    #[error("sensor backend: {0}")]
    Backend(String),
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("no shared buffer available for {consumer}")]
    BufferUnavailable {
        consumer: ConsumerType,
        #[source]
        source: sensa_icc::Error,
    },

    #[error("producer failed to start {consumer}")]
    ProducerStart {
        consumer: ConsumerType,
        #[source]
        source: ProducerError,
    },

    #[error("producer failed to stop {consumer}")]
    ProducerStop {
        consumer: ConsumerType,
        #[source]
        source: ProducerError,
    },

    #[error("failed to spawn the polling thread")]
    PollingThread(#[source] io::Error),

    #[error("the polling thread exited unexpectedly")]
    PollingThreadGone,

    #[error("the producer was lost with a crashed polling thread")]
    ProducerLost,
}

pub type Result<T> = std::result::Result<T, FetchError>;
