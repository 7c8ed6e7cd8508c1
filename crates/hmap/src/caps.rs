//! Capability bitstrings.

use crate::codes::INPUT_PROP_CNT;
use bit_vec::BitVec;

/// One bit per map row: set when the row bound to the descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caps {
    bits: BitVec,
}

impl Caps {
    pub fn new(rows: usize) -> Self {
        Self {
            bits: BitVec::from_elem(rows, false),
        }
    }

    pub fn set(&mut self, row: usize) {
        if row < self.bits.len() {
            self.bits.set(row, true);
        }
    }

    pub fn is_set(&self, row: usize) -> bool {
        self.bits.get(row).unwrap_or(false)
    }

    /// Number of rows in the map.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Number of bound rows.
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|bit| *bit).count()
    }

    pub fn none(&self) -> bool {
        self.bits.none()
    }

    /// Indices of bound rows.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(row, bit)| bit.then_some(row))
    }
}

/// Evdev input properties requested by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvdevProps {
    bits: BitVec,
}

impl Default for EvdevProps {
    fn default() -> Self {
        Self {
            bits: BitVec::from_elem(INPUT_PROP_CNT, false),
        }
    }
}

impl EvdevProps {
    /// Returns false when `prop` is outside the property table.
    pub fn set(&mut self, prop: u16) -> bool {
        let idx = usize::from(prop);
        if idx < self.bits.len() {
            self.bits.set(idx, true);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, prop: u16) -> bool {
        self.bits.get(usize::from(prop)).unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, bit)| *bit)
            .filter_map(|(idx, _)| u16::try_from(idx).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{INPUT_PROP_DIRECT, INPUT_PROP_POINTER};

    #[test]
    fn test_caps_bits() {
        let mut caps = Caps::new(5);
        assert!(caps.none());
        caps.set(1);
        caps.set(4);
        caps.set(9);
        assert_eq!(caps.len(), 5);
        assert_eq!(caps.count(), 2);
        assert!(caps.is_set(4));
        assert!(!caps.is_set(9));
        assert_eq!(caps.iter().collect::<Vec<_>>(), vec![1, 4]);
    }

    #[test]
    fn test_props() {
        let mut props = EvdevProps::default();
        assert!(props.set(INPUT_PROP_DIRECT));
        assert!(!props.set(0x40));
        assert!(props.contains(INPUT_PROP_DIRECT));
        assert!(!props.contains(INPUT_PROP_POINTER));
        assert_eq!(props.iter().collect::<Vec<_>>(), vec![INPUT_PROP_DIRECT]);
    }
}
