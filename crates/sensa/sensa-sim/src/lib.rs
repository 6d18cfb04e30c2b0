//! A polling producer that synthesizes sensor readings.
//!
//! Stands in for an OS sensor backend: every tick it evaluates smooth
//! waveforms at the tick's timestamp and publishes them into the active
//! buffers. Types listed as absent refuse to start, the way a device without
//! that sensor would.

use sensa_events::{ConsumerMask, ConsumerType, LightData, MotionData, OrientationData};
use sensa_fetcher::{DataProducer, DeviceBuffer, ProducerError, ThreadingMode};
use sensa_icc::BufferWriter;
use std::f64::consts::TAU;
use std::time::Duration;
use tracing::{debug, info};

/// Standard gravity, m/s^2.
pub const GRAVITY: f64 = 9.80665;

pub struct SimulatedProducer {
    interval: Duration,
    absent: ConsumerMask,
    motion: Option<BufferWriter<MotionData>>,
    orientation: Option<BufferWriter<OrientationData>>,
    orientation_absolute: Option<BufferWriter<OrientationData>>,
    light: Option<BufferWriter<LightData>>,
    ticks: u64,
}

impl SimulatedProducer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            absent: ConsumerMask::empty(),
            motion: None,
            orientation: None,
            orientation_absolute: None,
            light: None,
            ticks: 0,
        }
    }

    /// Marks `consumer` as missing hardware.
    pub fn without(mut self, consumer: ConsumerType) -> Self {
        self.absent.insert(consumer);
        self
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    fn elapsed_secs(&self) -> f64 {
        self.ticks as f64 * self.interval.as_secs_f64()
    }
}

/// Device motion `t` seconds into the simulation: a gentle sway on top of
/// gravity along z.
pub fn motion_at(t: f64, interval: Duration) -> MotionData {
    let x = 0.2 * (TAU * 0.5 * t).sin();
    let y = 0.2 * (TAU * 0.5 * t).cos();
    let z = 0.05 * (TAU * 1.3 * t).sin();

    let mut m = MotionData::default();
    m.set_acceleration(x, y, z);
    m.set_acceleration_including_gravity(x, y, z + GRAVITY);
    m.set_rotation_rate(
        10.0 * (TAU * 0.25 * t).sin(),
        5.0 * (TAU * 0.5 * t).cos(),
        2.0 * (TAU * 0.1 * t).sin(),
    );
    m.interval_ms = interval.as_micros() as f64 / 1e3;
    m.all_available_sensors_are_active = 1;
    m
}

/// Orientation `t` seconds in: alpha turns at 15 deg/s, beta and gamma
/// rock. The absolute stream is offset to a fixed compass heading.
pub fn orientation_at(t: f64, absolute: bool) -> OrientationData {
    let heading = if absolute { 90.0 } else { 0.0 };
    OrientationData::new(
        (t * 15.0 + heading).rem_euclid(360.0),
        20.0 * (TAU * 0.2 * t).sin(),
        10.0 * (TAU * 0.3 * t).cos(),
        absolute,
    )
}

/// Ambient light `t` seconds in: a slow swing between 100 and 500 lux.
pub fn light_at(t: f64) -> LightData {
    LightData {
        lux: 300.0 + 200.0 * (TAU * t / 10.0).sin(),
    }
}

impl DataProducer for SimulatedProducer {
    fn start(&mut self, consumer: ConsumerType, buffer: DeviceBuffer) -> Result<(), ProducerError> {
        if self.absent.contains(consumer) {
            return Err(ProducerError::Unavailable(consumer));
        }
        match buffer {
            DeviceBuffer::Motion(w) => self.motion = Some(w),
            DeviceBuffer::Orientation(w) => self.orientation = Some(w),
            DeviceBuffer::OrientationAbsolute(w) => self.orientation_absolute = Some(w),
            DeviceBuffer::Light(w) => self.light = Some(w),
        }
        info!(%consumer, "simulated sensor started");
        Ok(())
    }

    fn stop(&mut self, consumer: ConsumerType) -> Result<(), ProducerError> {
        let released = match consumer {
            ConsumerType::Motion => self.motion.take().is_some(),
            ConsumerType::Orientation => self.orientation.take().is_some(),
            ConsumerType::OrientationAbsolute => self.orientation_absolute.take().is_some(),
            ConsumerType::Light => self.light.take().is_some(),
        };
        debug!(%consumer, released, "simulated sensor stopped");
        Ok(())
    }

    fn fetch(&mut self, active: ConsumerMask) {
        self.ticks += 1;
        let t = self.elapsed_secs();

        if active.contains(ConsumerType::Motion) {
            if let Some(w) = self.motion.as_mut() {
                w.write(motion_at(t, self.interval));
            }
        }
        if active.contains(ConsumerType::Orientation) {
            if let Some(w) = self.orientation.as_mut() {
                w.write(orientation_at(t, false));
            }
        }
        if active.contains(ConsumerType::OrientationAbsolute) {
            if let Some(w) = self.orientation_absolute.as_mut() {
                w.write(orientation_at(t, true));
            }
        }
        if active.contains(ConsumerType::Light) {
            if let Some(w) = self.light.as_mut() {
                w.write(light_at(t));
            }
        }
    }

    fn mode(&self) -> ThreadingMode {
        ThreadingMode::PollingCallback
    }

    fn poll_interval(&self) -> Duration {
        self.interval
    }
}
