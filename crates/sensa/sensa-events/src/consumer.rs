use serde::{Deserialize, Serialize};
use std::fmt;

/// A class of data stream that can be started and stopped on its own and
/// gets its own shared region.
///
/// Discriminants are single bits so a set of active types fits in a
/// [`ConsumerMask`].
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerType {
    Motion = 1 << 0,
    Orientation = 1 << 1,
    OrientationAbsolute = 1 << 2,
    Light = 1 << 3,
}

impl ConsumerType {
    pub const ALL: [ConsumerType; 4] = [
        ConsumerType::Motion,
        ConsumerType::Orientation,
        ConsumerType::OrientationAbsolute,
        ConsumerType::Light,
    ];

    #[inline]
    pub const fn bit(self) -> u32 {
        self as u32
    }

    pub const fn name(self) -> &'static str {
        match self {
            ConsumerType::Motion => "motion",
            ConsumerType::Orientation => "orientation",
            ConsumerType::OrientationAbsolute => "orientation_absolute",
            ConsumerType::Light => "light",
        }
    }

    pub fn from_bit(bit: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.bit() == bit)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for ConsumerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Bitmask of consumer types, e.g. the set currently started or the set a
/// polling producer must refresh on a tick.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ConsumerMask(u32);

impl ConsumerMask {
    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(self, consumer: ConsumerType) -> bool {
        self.0 & consumer.bit() != 0
    }

    #[inline]
    pub fn insert(&mut self, consumer: ConsumerType) {
        self.0 |= consumer.bit();
    }

    #[inline]
    pub fn remove(&mut self, consumer: ConsumerType) {
        self.0 &= !consumer.bit();
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates the known consumer types set in this mask.
    pub fn iter(self) -> impl Iterator<Item = ConsumerType> {
        ConsumerType::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl From<ConsumerType> for ConsumerMask {
    fn from(consumer: ConsumerType) -> Self {
        Self(consumer.bit())
    }
}

impl FromIterator<ConsumerType> for ConsumerMask {
    fn from_iter<I: IntoIterator<Item = ConsumerType>>(iter: I) -> Self {
        let mut mask = Self::empty();
        for consumer in iter {
            mask.insert(consumer);
        }
        mask
    }
}

impl fmt::Debug for ConsumerMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_are_distinct() {
        let all: ConsumerMask = ConsumerType::ALL.into_iter().collect();
        assert_eq!(all.len(), ConsumerType::ALL.len());
        assert_eq!(all.bits(), 0b1111);
    }

    #[test]
    fn insert_remove_contains() {
        let mut mask = ConsumerMask::empty();
        assert!(mask.is_empty());

        mask.insert(ConsumerType::Motion);
        mask.insert(ConsumerType::Light);
        mask.insert(ConsumerType::Motion);
        assert!(mask.contains(ConsumerType::Motion));
        assert!(mask.contains(ConsumerType::Light));
        assert!(!mask.contains(ConsumerType::Orientation));
        assert_eq!(mask.len(), 2);

        mask.remove(ConsumerType::Motion);
        assert_eq!(mask, ConsumerMask::from(ConsumerType::Light));
        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![ConsumerType::Light]);
    }

    #[test]
    fn name_round_trip() {
        for c in ConsumerType::ALL {
            assert_eq!(ConsumerType::from_name(c.name()), Some(c));
            assert_eq!(ConsumerType::from_bit(c.bit()), Some(c));
        }
        assert_eq!(ConsumerType::from_name("gyro"), None);
        assert_eq!(ConsumerType::from_bit(1 << 9), None);
    }
}
