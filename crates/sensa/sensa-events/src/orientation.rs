use crate::Pod;

/// Device orientation in degrees. Shared by the relative and absolute
/// orientation streams; `absolute` tells them apart.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OrientationData {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub has_alpha: u8,
    pub has_beta: u8,
    pub has_gamma: u8,
    pub absolute: u8,
    pub all_available_sensors_are_active: u8,
    pub _pad: [u8; 3],
}

unsafe impl Pod for OrientationData {}

impl OrientationData {
    pub fn new(alpha: f64, beta: f64, gamma: f64, absolute: bool) -> Self {
        Self {
            alpha,
            beta,
            gamma,
            has_alpha: 1,
            has_beta: 1,
            has_gamma: 1,
            absolute: absolute as u8,
            all_available_sensors_are_active: 1,
            _pad: [0; 3],
        }
    }

    #[inline]
    pub fn is_absolute(&self) -> bool {
        self.absolute != 0
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.has_alpha != 0 && self.has_beta != 0 && self.has_gamma != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn orientation_layout_is_stable() {
        assert_eq!(size_of::<OrientationData>(), 32, "OrientationData layout changed");
    }

    #[test]
    fn new_sets_flags() {
        let o = OrientationData::new(10.0, 20.0, 30.0, true);
        assert!(o.is_complete());
        assert!(o.is_absolute());
        assert!(!OrientationData::default().is_complete());
    }
}
