use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("shared memory i/o on '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid region layout in '{}': {reason}", path.display())]
    Layout { path: PathBuf, reason: &'static str },

    #[error("handle for '{}' no longer names a live region", path.display())]
    InvalidHandle { path: PathBuf },

    #[error("region '{}' already has a live writer", path.display())]
    WriterBusy { path: PathBuf },

    #[error("region holds {region} byte payloads, requested type is {requested} bytes")]
    PayloadMismatch { region: usize, requested: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
