//! The background thread that serializes producer calls.
//!
//! The producer is lent to the thread for its whole lifetime: it travels in
//! over a one-slot handoff channel and comes back out of `join`. While it is
//! away the manager only talks to it through the task queue, so the producer
//! never needs a lock. Starts the producer refuses travel back on a
//! separate channel the manager drains.

use crate::buffer::DeviceBuffer;
use crate::error::ProducerError;
use crate::producer::{DataProducer, ThreadingMode};
use sensa_events::{ConsumerMask, ConsumerType};
use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub(crate) const THREAD_NAME: &str = "sensa-polling";

pub(crate) enum PollingTask {
    /// The writer arrives already zeroed.
    AddConsumer(DeviceBuffer),
    RemoveConsumer(ConsumerType),
    /// Answered once every task queued before it has run.
    Barrier(SyncSender<()>),
    Shutdown,
}

/// Fixed-rate deadline. Ticks are scheduled from the previous deadline, not
/// from when the tick ran, so the rate does not drift; a tick that overran
/// a whole period skips ahead instead of bursting.
#[derive(Debug)]
struct RepeatingTimer {
    interval: Duration,
    next: Instant,
}

impl RepeatingTimer {
    fn start(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now() + interval,
        }
    }

    fn advance(&mut self) {
        self.next += self.interval;
        let now = Instant::now();
        if self.next <= now {
            self.next = now + self.interval;
        }
    }
}

/// Everything the polling thread owns.
pub(crate) struct PollingState {
    producer: Box<dyn DataProducer>,
    mode: ThreadingMode,
    interval: Duration,
    active: ConsumerMask,
    timer: Option<RepeatingTimer>,
}

impl PollingState {
    pub(crate) fn new(producer: Box<dyn DataProducer>) -> Self {
        let mode = producer.mode();
        // A zero period would spin the thread.
        let interval = producer.poll_interval().max(Duration::from_millis(1));
        Self {
            producer,
            mode,
            interval,
            active: ConsumerMask::empty(),
            timer: None,
        }
    }

    /// Hands `buffer` to the producer. On refusal the writer is dropped and
    /// the stream stays inactive.
    pub(crate) fn add_consumer(&mut self, buffer: DeviceBuffer) -> Result<(), ProducerError> {
        let consumer = buffer.consumer_type();
        if self.active.contains(consumer) {
            return Ok(());
        }
        if let Err(e) = self.producer.start(consumer, buffer) {
            warn!(%consumer, error = %e, "producer failed to start on polling thread");
            return Err(e);
        }

        let was_idle = self.active.is_empty();
        self.active.insert(consumer);
        if was_idle && self.mode == ThreadingMode::PollingCallback {
            self.timer = Some(RepeatingTimer::start(self.interval));
            debug!(interval = ?self.interval, "polling timer armed");
        }
        Ok(())
    }

    pub(crate) fn remove_consumer(&mut self, consumer: ConsumerType) {
        // A stream whose start failed was never registered with the producer.
        if !self.active.contains(consumer) {
            debug!(%consumer, "not active on polling thread");
            return;
        }
        if let Err(e) = self.producer.stop(consumer) {
            warn!(%consumer, error = %e, "producer failed to stop on polling thread");
        }
        self.active.remove(consumer);
        if self.active.is_empty() && self.timer.take().is_some() {
            debug!("polling timer disarmed");
        }
    }

    /// One timer tick: a single `fetch` covering every active stream.
    pub(crate) fn do_poll(&mut self) {
        if self.active.is_empty() {
            return;
        }
        self.producer.fetch(self.active);
        if let Some(timer) = self.timer.as_mut() {
            timer.advance();
        }
    }

    pub(crate) fn active(&self) -> ConsumerMask {
        self.active
    }

    pub(crate) fn timer_armed(&self) -> bool {
        self.timer.is_some()
    }

    fn deadline(&self) -> Option<Instant> {
        self.timer.as_ref().map(|t| t.next)
    }

    /// Stops whatever is still active and gives the producer back.
    pub(crate) fn into_producer(mut self) -> Box<dyn DataProducer> {
        for consumer in self.active.iter() {
            self.remove_consumer(consumer);
        }
        self.producer
    }
}

fn run(
    handoff: Receiver<Box<dyn DataProducer>>,
    rx: Receiver<PollingTask>,
    refusals: Sender<ConsumerType>,
) -> Option<Box<dyn DataProducer>> {
    let mut state = PollingState::new(handoff.recv().ok()?);

    loop {
        let task = match state.deadline() {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    state.do_poll();
                    continue;
                }
                match rx.recv_timeout(deadline - now) {
                    Ok(task) => task,
                    Err(RecvTimeoutError::Timeout) => {
                        state.do_poll();
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match rx.recv() {
                Ok(task) => task,
                Err(_) => break,
            },
        };

        match task {
            PollingTask::AddConsumer(buffer) => {
                let consumer = buffer.consumer_type();
                if state.add_consumer(buffer).is_err() {
                    let _ = refusals.send(consumer);
                }
            }
            PollingTask::RemoveConsumer(consumer) => state.remove_consumer(consumer),
            PollingTask::Barrier(ack) => {
                let _ = ack.send(());
            }
            PollingTask::Shutdown => break,
        }
    }

    Some(state.into_producer())
}

/// Handle to the running polling thread.
pub(crate) struct PollingThread {
    tx: Sender<PollingTask>,
    refusals: Receiver<ConsumerType>,
    join: JoinHandle<Option<Box<dyn DataProducer>>>,
}

impl PollingThread {
    /// Spawns the thread and moves `producer` onto it. On failure the
    /// producer is handed back with the error.
    pub(crate) fn spawn(
        producer: Box<dyn DataProducer>,
    ) -> Result<Self, (Box<dyn DataProducer>, io::Error)> {
        let (tx, rx) = mpsc::channel();
        let (refusals_tx, refusals) = mpsc::channel();
        let (handoff_tx, handoff_rx) = mpsc::sync_channel(1);
        let join = match thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run(handoff_rx, rx, refusals_tx))
        {
            Ok(join) => join,
            Err(e) => return Err((producer, e)),
        };

        if let Err(mpsc::SendError(producer)) = handoff_tx.send(producer) {
            let _ = join.join();
            return Err((producer, io::Error::other("polling thread exited at startup")));
        }

        info!("polling thread started");
        Ok(Self { tx, refusals, join })
    }

    /// Queues a task. Fails only if the thread is gone.
    pub(crate) fn post(&self, task: PollingTask) -> bool {
        self.tx.send(task).is_ok()
    }

    /// Blocks until every task posted so far has run. False if the thread
    /// is gone.
    pub(crate) fn barrier(&self) -> bool {
        let (ack, done) = mpsc::sync_channel(1);
        self.post(PollingTask::Barrier(ack)) && done.recv().is_ok()
    }

    /// Types whose start the producer refused since the last call.
    pub(crate) fn take_refusals(&self) -> Vec<ConsumerType> {
        self.refusals.try_iter().collect()
    }

    /// Drains queued tasks, stops the thread and takes the producer back.
    /// `None` means the thread panicked and the producer went with it.
    pub(crate) fn shutdown(self) -> Option<Box<dyn DataProducer>> {
        let _ = self.tx.send(PollingTask::Shutdown);
        match self.join.join() {
            Ok(producer) => {
                info!("polling thread stopped");
                producer
            }
            Err(_) => {
                error!("polling thread panicked");
                None
            }
        }
    }
}
