pub mod consumer;
pub mod light;
pub mod motion;
pub mod orientation;
pub mod pod;

pub use consumer::{ConsumerMask, ConsumerType};
pub use light::LightData;
pub use motion::MotionData;
pub use orientation::OrientationData;
pub use pod::Pod;
