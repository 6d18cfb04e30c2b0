use sensa_events::{ConsumerType, LightData, MotionData, OrientationData};
use sensa_icc::{BufferWriter, SharedRegion};
use std::path::Path;
use std::sync::Arc;

/// Creates the region for `consumer` with the payload layout that type
/// carries.
pub fn allocate_region(path: &Path, consumer: ConsumerType) -> sensa_icc::Result<Arc<SharedRegion>> {
    match consumer {
        ConsumerType::Motion => SharedRegion::create::<MotionData>(path, consumer),
        ConsumerType::Orientation | ConsumerType::OrientationAbsolute => {
            SharedRegion::create::<OrientationData>(path, consumer)
        }
        ConsumerType::Light => SharedRegion::create::<LightData>(path, consumer),
    }
}

/// The write end of one stream's region, typed by consumer.
#[derive(Debug)]
pub enum DeviceBuffer {
    Motion(BufferWriter<MotionData>),
    Orientation(BufferWriter<OrientationData>),
    OrientationAbsolute(BufferWriter<OrientationData>),
    Light(BufferWriter<LightData>),
}

impl DeviceBuffer {
    /// Takes the writer of `region`. Fails with `WriterBusy` while a
    /// previous writer (e.g. one a producer never released) is alive.
    pub fn take(region: &Arc<SharedRegion>) -> sensa_icc::Result<Self> {
        Ok(match region.consumer_type() {
            ConsumerType::Motion => DeviceBuffer::Motion(region.writer()?),
            ConsumerType::Orientation => DeviceBuffer::Orientation(region.writer()?),
            ConsumerType::OrientationAbsolute => DeviceBuffer::OrientationAbsolute(region.writer()?),
            ConsumerType::Light => DeviceBuffer::Light(region.writer()?),
        })
    }

    pub fn consumer_type(&self) -> ConsumerType {
        match self {
            DeviceBuffer::Motion(_) => ConsumerType::Motion,
            DeviceBuffer::Orientation(_) => ConsumerType::Orientation,
            DeviceBuffer::OrientationAbsolute(_) => ConsumerType::OrientationAbsolute,
            DeviceBuffer::Light(_) => ConsumerType::Light,
        }
    }

    /// Zeroes the payload as one seqlock-bracketed write.
    pub fn reset(&mut self) {
        match self {
            DeviceBuffer::Motion(w) => w.reset(),
            DeviceBuffer::Orientation(w) | DeviceBuffer::OrientationAbsolute(w) => w.reset(),
            DeviceBuffer::Light(w) => w.reset(),
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            DeviceBuffer::Motion(w) => w.version(),
            DeviceBuffer::Orientation(w) | DeviceBuffer::OrientationAbsolute(w) => w.version(),
            DeviceBuffer::Light(w) => w.version(),
        }
    }

    pub fn into_motion(self) -> Option<BufferWriter<MotionData>> {
        match self {
            DeviceBuffer::Motion(w) => Some(w),
            _ => None,
        }
    }

    /// Either orientation stream; check `consumer_type` first if the
    /// distinction matters.
    pub fn into_orientation(self) -> Option<BufferWriter<OrientationData>> {
        match self {
            DeviceBuffer::Orientation(w) | DeviceBuffer::OrientationAbsolute(w) => Some(w),
            _ => None,
        }
    }

    pub fn into_light(self) -> Option<BufferWriter<LightData>> {
        match self {
            DeviceBuffer::Light(w) => Some(w),
            _ => None,
        }
    }
}
