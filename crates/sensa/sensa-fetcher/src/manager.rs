use crate::buffer::{DeviceBuffer, allocate_region};
use crate::error::{FetchError, Result};
use crate::polling::{PollingTask, PollingThread};
use crate::producer::{DataProducer, ThreadingMode};
use sensa_events::{ConsumerMask, ConsumerType};
use sensa_icc::{HandleDescriptor, SharedMemoryHandle, SharedRegion};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, error, info, warn};

static NEXT_INSTANCE: AtomicU32 = AtomicU32::new(0);

/// `/dev/shm` where it exists, the system temp dir otherwise.
pub fn default_shm_dir() -> PathBuf {
    let shm = Path::new("/dev/shm");
    if shm.is_dir() {
        shm.to_path_buf()
    } else {
        std::env::temp_dir()
    }
}

/// Where a manager puts its regions.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub shm_dir: PathBuf,
    pub region_prefix: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            shm_dir: default_shm_dir(),
            region_prefix: "sensa".to_string(),
        }
    }
}

/// Identifies the consumer process a handle is handed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProcessId(pub u32);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owns the shared regions and the producer, and turns per-type start/stop
/// requests into producer calls on the right thread.
///
/// All methods take `&mut self`; the started set and the region table are
/// only touched from the thread that owns the manager.
pub struct ConsumerLifecycleManager {
    config: FetcherConfig,
    instance: u32,
    mode: ThreadingMode,
    /// `None` while the producer is lent to the polling thread.
    producer: Option<Box<dyn DataProducer>>,
    polling: Option<PollingThread>,
    regions: BTreeMap<ConsumerType, Arc<SharedRegion>>,
    started: ConsumerMask,
}

impl ConsumerLifecycleManager {
    pub fn new(producer: Box<dyn DataProducer>, config: FetcherConfig) -> Self {
        let mode = producer.mode();
        let instance = NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed);
        info!(?mode, dir = %config.shm_dir.display(), "lifecycle manager created");
        Self {
            config,
            instance,
            mode,
            producer: Some(producer),
            polling: None,
            regions: BTreeMap::new(),
            started: ConsumerMask::empty(),
        }
    }

    pub fn mode(&self) -> ThreadingMode {
        self.mode
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Starts streaming `consumer`. A no-op if it is already started.
    ///
    /// The region is zeroed here, before this returns and before the
    /// producer gets its writer, so a reader never sees data from an earlier
    /// activation. In the polling modes the producer call is queued and this
    /// returns once it is posted; if the producer then refuses, the type
    /// drops out of the started set and a later call starts it afresh.
    pub fn start_fetching(&mut self, consumer: ConsumerType) -> Result<()> {
        self.collect_refusals();
        if self.started.contains(consumer) {
            debug!(%consumer, "already fetching");
            return Ok(());
        }
        let region = self
            .region(consumer)
            .map_err(|source| FetchError::BufferUnavailable { consumer, source })?;
        let mut buffer = self.take_writer(consumer, &region)?;
        buffer.reset();

        if self.mode.uses_polling_thread() {
            let posted = self.polling_thread()?.post(PollingTask::AddConsumer(buffer));
            if !posted {
                self.stop_polling_thread();
                return Err(FetchError::PollingThreadGone);
            }
        } else {
            let producer = self.producer.as_mut().ok_or(FetchError::ProducerLost)?;
            producer
                .start(consumer, buffer)
                .map_err(|source| FetchError::ProducerStart { consumer, source })?;
        }

        self.started.insert(consumer);
        info!(%consumer, mode = ?self.mode, "started fetching");
        Ok(())
    }

    /// Stops streaming `consumer`. A no-op if it is not started. Stopping
    /// the last started type tears the polling thread down.
    pub fn stop_fetching(&mut self, consumer: ConsumerType) -> Result<()> {
        self.collect_refusals();
        if !self.started.contains(consumer) {
            debug!(%consumer, "not fetching");
            return Ok(());
        }

        if self.mode.uses_polling_thread() {
            let posted = self
                .polling
                .as_ref()
                .is_some_and(|t| t.post(PollingTask::RemoveConsumer(consumer)));
            if !posted {
                self.started.remove(consumer);
                self.stop_polling_thread();
                return Err(FetchError::PollingThreadGone);
            }
        } else {
            let producer = self.producer.as_mut().ok_or(FetchError::ProducerLost)?;
            producer
                .stop(consumer)
                .map_err(|source| FetchError::ProducerStop { consumer, source })?;
        }

        self.started.remove(consumer);
        info!(%consumer, "stopped fetching");
        if self.started.is_empty() {
            self.stop_polling_thread();
        }
        Ok(())
    }

    /// A clone of the owning handle for `consumer`'s region, creating the
    /// region on first use.
    pub fn buffer_handle(&mut self, consumer: ConsumerType) -> Option<SharedMemoryHandle> {
        match self.region(consumer) {
            Ok(region) => Some(region.handle()),
            Err(e) => {
                warn!(%consumer, error = %e, "no shared buffer");
                None
            }
        }
    }

    /// What `process` needs to attach a reader to `consumer`'s region. The
    /// region stays alive for as long as this manager does.
    pub fn handle_for_process(
        &mut self,
        consumer: ConsumerType,
        process: ProcessId,
    ) -> Option<HandleDescriptor> {
        let handle = self.buffer_handle(consumer)?;
        debug!(%consumer, %process, path = %handle.path().display(), "handing out region");
        Some(handle.descriptor())
    }

    /// Stops every started type and joins the polling thread.
    pub fn shutdown(&mut self) {
        for consumer in self.started.iter() {
            if let Err(e) = self.stop_fetching(consumer) {
                warn!(%consumer, error = %e, "stop failed during shutdown");
                self.started.remove(consumer);
            }
        }
        self.stop_polling_thread();
    }

    /// Refusals the polling thread has reported so far are applied first.
    pub fn started_consumers(&mut self) -> ConsumerMask {
        self.collect_refusals();
        self.started
    }

    pub fn is_fetching(&mut self, consumer: ConsumerType) -> bool {
        self.started_consumers().contains(consumer)
    }

    pub fn polling_thread_running(&self) -> bool {
        self.polling.is_some()
    }

    pub fn region_path(&self, consumer: ConsumerType) -> PathBuf {
        self.config.shm_dir.join(format!(
            "{}_{}_{}_{}",
            self.config.region_prefix,
            std::process::id(),
            self.instance,
            consumer.name()
        ))
    }

    fn region(&mut self, consumer: ConsumerType) -> sensa_icc::Result<Arc<SharedRegion>> {
        if let Some(region) = self.regions.get(&consumer) {
            return Ok(Arc::clone(region));
        }
        let region = allocate_region(&self.region_path(consumer), consumer)?;
        self.regions.insert(consumer, Arc::clone(&region));
        Ok(region)
    }

    /// The region's writer. A type stopped moments ago may still hold it on
    /// the polling thread, so a busy writer first waits out the queued tasks.
    fn take_writer(&self, consumer: ConsumerType, region: &Arc<SharedRegion>) -> Result<DeviceBuffer> {
        let buffer = match (DeviceBuffer::take(region), &self.polling) {
            (Err(sensa_icc::Error::WriterBusy { .. }), Some(thread)) if thread.barrier() => {
                DeviceBuffer::take(region)
            }
            (result, _) => result,
        };
        buffer.map_err(|source| FetchError::BufferUnavailable { consumer, source })
    }

    /// Clears the types whose start the producer refused on the polling
    /// thread, and retires the thread if nothing is left.
    fn collect_refusals(&mut self) {
        let Some(thread) = self.polling.as_ref() else {
            return;
        };
        let refused = thread.take_refusals();
        if refused.is_empty() {
            return;
        }
        for consumer in refused {
            self.started.remove(consumer);
            info!(%consumer, "start refused by producer");
        }
        if self.started.is_empty() {
            self.stop_polling_thread();
        }
    }

    fn polling_thread(&mut self) -> Result<&PollingThread> {
        if self.polling.is_none() {
            let producer = self.producer.take().ok_or(FetchError::ProducerLost)?;
            match PollingThread::spawn(producer) {
                Ok(thread) => self.polling = Some(thread),
                Err((producer, e)) => {
                    self.producer = Some(producer);
                    return Err(FetchError::PollingThread(e));
                }
            }
        }
        self.polling.as_ref().ok_or(FetchError::PollingThreadGone)
    }

    fn stop_polling_thread(&mut self) {
        let Some(thread) = self.polling.take() else {
            return;
        };
        match thread.shutdown() {
            Some(producer) => self.producer = Some(producer),
            None => error!("producer lost with the polling thread"),
        }
    }
}

impl Drop for ConsumerLifecycleManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
