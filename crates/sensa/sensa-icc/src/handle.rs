//! Reference-counted handle naming a shared region.
//!
//! Cloning a handle is the only way to extend the region's lifetime: the
//! owning side removes the backing file once the last clone of its handle
//! is dropped. A handle delivered to another process travels as a
//! [`HandleDescriptor`] and comes back as a non-owning handle there; keeping
//! the region alive for remote readers stays the owner's job.

use sensa_events::ConsumerType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Serializable form of a handle, for the IPC layer to ship across a
/// process boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleDescriptor {
    pub path: PathBuf,
    pub size: u64,
    pub consumer_type: ConsumerType,
}

#[derive(Debug, Clone)]
pub struct SharedMemoryHandle {
    inner: Arc<HandleInner>,
}

#[derive(Debug)]
struct HandleInner {
    desc: HandleDescriptor,
    owner: bool,
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        if !self.owner {
            return;
        }
        match std::fs::remove_file(&self.desc.path) {
            Ok(()) => debug!(path = %self.desc.path.display(), "removed shared region"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.desc.path.display(), error = %e, "failed to remove shared region"),
        }
    }
}

impl SharedMemoryHandle {
    pub(crate) fn owning(desc: HandleDescriptor) -> Self {
        Self {
            inner: Arc::new(HandleInner { desc, owner: true }),
        }
    }

    /// Rebuilds a handle from a descriptor received from the owning process.
    /// The result never removes the region.
    pub fn from_descriptor(desc: HandleDescriptor) -> Self {
        Self {
            inner: Arc::new(HandleInner { desc, owner: false }),
        }
    }

    pub fn descriptor(&self) -> HandleDescriptor {
        self.inner.desc.clone()
    }

    pub fn path(&self) -> &Path {
        &self.inner.desc.path
    }

    pub fn size(&self) -> u64 {
        self.inner.desc.size
    }

    pub fn consumer_type(&self) -> ConsumerType {
        self.inner.desc.consumer_type
    }

    pub fn is_owner(&self) -> bool {
        self.inner.owner
    }

    /// True while the backing file exists with the recorded size.
    pub fn is_valid(&self) -> bool {
        std::fs::metadata(self.path())
            .map(|m| m.is_file() && m.len() == self.size())
            .unwrap_or(false)
    }

    /// Number of live clones of this handle in this process.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}
