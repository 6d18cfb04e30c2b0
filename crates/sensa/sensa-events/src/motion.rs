use crate::Pod;

// Flags are u8 rather than bool: a discarded torn copy may hold any byte,
// and that must still be a valid value.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotionData {
    /// Acceleration excluding gravity, m/s^2.
    pub acceleration_x: f64,
    pub acceleration_y: f64,
    pub acceleration_z: f64,
    /// Acceleration including gravity, m/s^2.
    pub acceleration_including_gravity_x: f64,
    pub acceleration_including_gravity_y: f64,
    pub acceleration_including_gravity_z: f64,
    /// Rotation rate, deg/s.
    pub rotation_rate_alpha: f64,
    pub rotation_rate_beta: f64,
    pub rotation_rate_gamma: f64,
    /// Sampling interval the producer runs at, ms.
    pub interval_ms: f64,

    pub has_acceleration_x: u8,
    pub has_acceleration_y: u8,
    pub has_acceleration_z: u8,
    pub has_acceleration_including_gravity_x: u8,
    pub has_acceleration_including_gravity_y: u8,
    pub has_acceleration_including_gravity_z: u8,
    pub has_rotation_rate_alpha: u8,
    pub has_rotation_rate_beta: u8,
    pub has_rotation_rate_gamma: u8,
    pub all_available_sensors_are_active: u8,
    pub _pad: [u8; 6],
}

unsafe impl Pod for MotionData {}

impl MotionData {
    pub fn set_acceleration(&mut self, x: f64, y: f64, z: f64) {
        self.acceleration_x = x;
        self.acceleration_y = y;
        self.acceleration_z = z;
        self.has_acceleration_x = 1;
        self.has_acceleration_y = 1;
        self.has_acceleration_z = 1;
    }

    pub fn set_acceleration_including_gravity(&mut self, x: f64, y: f64, z: f64) {
        self.acceleration_including_gravity_x = x;
        self.acceleration_including_gravity_y = y;
        self.acceleration_including_gravity_z = z;
        self.has_acceleration_including_gravity_x = 1;
        self.has_acceleration_including_gravity_y = 1;
        self.has_acceleration_including_gravity_z = 1;
    }

    pub fn set_rotation_rate(&mut self, alpha: f64, beta: f64, gamma: f64) {
        self.rotation_rate_alpha = alpha;
        self.rotation_rate_beta = beta;
        self.rotation_rate_gamma = gamma;
        self.has_rotation_rate_alpha = 1;
        self.has_rotation_rate_beta = 1;
        self.has_rotation_rate_gamma = 1;
    }

    #[inline]
    pub fn has_acceleration(&self) -> bool {
        self.has_acceleration_x != 0 && self.has_acceleration_y != 0 && self.has_acceleration_z != 0
    }

    #[inline]
    pub fn has_rotation_rate(&self) -> bool {
        self.has_rotation_rate_alpha != 0
            && self.has_rotation_rate_beta != 0
            && self.has_rotation_rate_gamma != 0
    }

    #[inline]
    pub fn all_available_sensors_are_active(&self) -> bool {
        self.all_available_sensors_are_active != 0
    }
}
