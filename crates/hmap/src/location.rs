//! Field locations inside a report and value extraction.

use serde::{Deserialize, Serialize};

/// Position of a field inside the payload of one report.
///
/// `bit_offset` counts from the first payload byte; the report ID byte, when
/// the descriptor uses IDs, is not part of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    pub report_id: u8,
    pub bit_offset: u32,
    pub bit_width: u8,
    pub count: u16,
    pub logical_min: i32,
    pub logical_max: i32,
    pub is_signed: bool,
}

impl Location {
    /// Total bits covered by all slots.
    pub fn total_bits(&self) -> u64 {
        u64::from(self.bit_width) * u64::from(self.count)
    }

    /// Value of the first slot.
    #[inline]
    pub fn extract(&self, payload: &[u8]) -> i32 {
        extract_bits(payload, self.bit_offset, self.bit_width, self.is_signed)
    }

    /// Value of slot `slot`; slots are packed back to back.
    #[inline]
    pub fn extract_slot(&self, payload: &[u8], slot: u16) -> i32 {
        let offset = u64::from(self.bit_offset) + u64::from(slot) * u64::from(self.bit_width);
        match u32::try_from(offset) {
            Ok(offset) => extract_bits(payload, offset, self.bit_width, self.is_signed),
            Err(_) => 0,
        }
    }
}

/// Read `width` bits (1..=32) starting at `bit_offset`, least significant bit
/// first. Bits past the end of `payload` read as zero. The result is sign
/// extended when `signed` is set.
pub fn extract_bits(payload: &[u8], bit_offset: u32, width: u8, signed: bool) -> i32 {
    let width = u32::from(width.min(32));
    if width == 0 {
        return 0;
    }

    let first = (bit_offset / 8) as usize;
    let shift = bit_offset % 8;

    // At most 5 bytes cover 32 bits at any bit alignment.
    let mut raw: u64 = 0;
    for i in 0..5usize {
        let byte = first
            .checked_add(i)
            .and_then(|idx| payload.get(idx))
            .copied()
            .unwrap_or(0);
        raw |= u64::from(byte) << (8 * i);
    }

    let mask = (1u64 << width) - 1;
    let value = ((raw >> shift) & mask) as u32;

    if signed && width < 32 {
        let unused = 32 - width;
        ((value << unused) as i32) >> unused
    } else {
        value as i32
    }
}
