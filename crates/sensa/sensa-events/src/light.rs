use crate::Pod;

/// Ambient light level.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LightData {
    pub lux: f64,
}

unsafe impl Pod for LightData {}
