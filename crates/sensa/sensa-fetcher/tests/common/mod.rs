#![allow(dead_code)]

use sensa_events::{ConsumerMask, ConsumerType, LightData, OrientationData};
use sensa_fetcher::{
    ConsumerLifecycleManager, DataProducer, DeviceBuffer, FetcherConfig, ProducerError,
    ThreadingMode,
};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Everything a [`RecordingProducer`] was asked to do.
#[derive(Default)]
pub struct Calls {
    /// Type started and the name of the thread the call ran on.
    pub starts: Vec<(ConsumerType, Option<String>)>,
    pub stops: Vec<ConsumerType>,
    pub fetches: Vec<ConsumerMask>,
    /// When set, a started light stream immediately publishes this lux.
    pub light_on_start: Option<f64>,
    /// Types to refuse for now; unlike `without`, tests can clear it.
    pub refuse: ConsumerMask,
}

impl Calls {
    pub fn started(&self) -> Vec<ConsumerType> {
        self.starts.iter().map(|(c, _)| *c).collect()
    }
}

/// A producer that writes a tick counter into every active buffer and logs
/// each call.
pub struct RecordingProducer {
    mode: ThreadingMode,
    interval: Duration,
    unavailable: ConsumerMask,
    buffers: Vec<DeviceBuffer>,
    ticks: u64,
    calls: Arc<Mutex<Calls>>,
}

impl RecordingProducer {
    pub fn new(mode: ThreadingMode) -> (Self, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let producer = Self {
            mode,
            interval: Duration::from_millis(2),
            unavailable: ConsumerMask::empty(),
            buffers: Vec::new(),
            ticks: 0,
            calls: Arc::clone(&calls),
        };
        (producer, calls)
    }

    pub fn without(mut self, consumer: ConsumerType) -> Self {
        self.unavailable.insert(consumer);
        self
    }
}

impl DataProducer for RecordingProducer {
    fn start(&mut self, consumer: ConsumerType, mut buffer: DeviceBuffer) -> Result<(), ProducerError> {
        let mut calls = self.calls.lock().unwrap();
        if self.unavailable.contains(consumer) || calls.refuse.contains(consumer) {
            return Err(ProducerError::Unavailable(consumer));
        }
        let thread = std::thread::current().name().map(str::to_string);
        calls.starts.push((consumer, thread));
        if let (Some(lux), DeviceBuffer::Light(w)) = (calls.light_on_start, &mut buffer) {
            w.write(LightData { lux });
        }
        self.buffers.push(buffer);
        Ok(())
    }

    fn stop(&mut self, consumer: ConsumerType) -> Result<(), ProducerError> {
        self.buffers.retain(|b| b.consumer_type() != consumer);
        self.calls.lock().unwrap().stops.push(consumer);
        Ok(())
    }

    fn fetch(&mut self, active: ConsumerMask) {
        self.ticks += 1;
        let t = self.ticks as f64;
        let interval_ms = self.interval.as_millis() as f64;
        for buffer in &mut self.buffers {
            if !active.contains(buffer.consumer_type()) {
                continue;
            }
            match buffer {
                DeviceBuffer::Motion(w) => w.update(|m| {
                    m.set_acceleration(t, 2.0 * t, 3.0 * t);
                    m.interval_ms = interval_ms;
                }),
                DeviceBuffer::Orientation(w) => w.write(OrientationData::new(t, t, t, false)),
                DeviceBuffer::OrientationAbsolute(w) => {
                    w.write(OrientationData::new(t, t, t, true))
                }
                DeviceBuffer::Light(w) => w.write(LightData { lux: t }),
            }
        }
        self.calls.lock().unwrap().fetches.push(active);
    }

    fn mode(&self) -> ThreadingMode {
        self.mode
    }

    fn poll_interval(&self) -> Duration {
        self.interval
    }
}

pub fn manager_in(dir: &tempfile::TempDir, producer: RecordingProducer) -> ConsumerLifecycleManager {
    let config = FetcherConfig {
        shm_dir: dir.path().to_path_buf(),
        region_prefix: "sensa-test".to_string(),
    };
    ConsumerLifecycleManager::new(Box::new(producer), config)
}

/// Polls `cond` for up to two seconds.
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}
