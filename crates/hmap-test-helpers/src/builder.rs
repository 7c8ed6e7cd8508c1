//! Report descriptor builder.
//!
//! Emits short items with the smallest data size that holds the value.
//!
//! ```rust
//! use hmap_test_helpers::builder::{DescriptorBuilder, input};
//!
//! let desc = DescriptorBuilder::new()
//!     .usage_page(0x01)
//!     .usage(0x30)
//!     .report_size(8)
//!     .report_count(1)
//!     .input(input::DATA_VAR_ABS)
//!     .build();
//! assert_eq!(desc, vec![0x05, 0x01, 0x09, 0x30, 0x75, 0x08, 0x95, 0x01, 0x81, 0x02]);
//! ```

use hmap::Usage;

/// Main item data values for Input items.
pub mod input {
    pub const DATA_ARRAY_ABS: u32 = 0x00;
    pub const CONSTANT: u32 = 0x01;
    pub const DATA_VAR_ABS: u32 = 0x02;
    pub const CONSTANT_VAR: u32 = 0x03;
    pub const DATA_VAR_REL: u32 = 0x06;
}

/// Collection types.
pub mod collection {
    pub const PHYSICAL: u8 = 0x00;
    pub const APPLICATION: u8 = 0x01;
    pub const LOGICAL: u8 = 0x02;
}

const MAIN: u8 = 0;
const GLOBAL: u8 = 1;
const LOCAL: u8 = 2;

fn unsigned_bytes(value: u32) -> Vec<u8> {
    if value <= 0xFF {
        vec![value as u8]
    } else if value <= 0xFFFF {
        (value as u16).to_le_bytes().to_vec()
    } else {
        value.to_le_bytes().to_vec()
    }
}

fn signed_bytes(value: i32) -> Vec<u8> {
    if let Ok(v) = i8::try_from(value) {
        v.to_le_bytes().to_vec()
    } else if let Ok(v) = i16::try_from(value) {
        v.to_le_bytes().to_vec()
    } else {
        value.to_le_bytes().to_vec()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorBuilder {
    bytes: Vec<u8>,
}

impl DescriptorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn item(mut self, tag: u8, item_type: u8, data: &[u8]) -> Self {
        let size_code = match data.len() {
            0 => 0,
            1 => 1,
            2 => 2,
            _ => 3,
        };
        self.bytes.push((tag << 4) | (item_type << 2) | size_code);
        self.bytes.extend_from_slice(data);
        self
    }

    pub fn usage_page(self, page: u16) -> Self {
        self.item(0, GLOBAL, &unsigned_bytes(u32::from(page)))
    }

    pub fn logical_min(self, value: i32) -> Self {
        self.item(1, GLOBAL, &signed_bytes(value))
    }

    pub fn logical_max(self, value: i32) -> Self {
        self.item(2, GLOBAL, &signed_bytes(value))
    }

    pub fn physical_min(self, value: i32) -> Self {
        self.item(3, GLOBAL, &signed_bytes(value))
    }

    pub fn physical_max(self, value: i32) -> Self {
        self.item(4, GLOBAL, &signed_bytes(value))
    }

    pub fn unit_exponent(self, value: u8) -> Self {
        self.item(5, GLOBAL, &[value])
    }

    pub fn unit(self, value: u32) -> Self {
        self.item(6, GLOBAL, &unsigned_bytes(value))
    }

    pub fn report_size(self, bits: u32) -> Self {
        self.item(7, GLOBAL, &unsigned_bytes(bits))
    }

    pub fn report_id(self, id: u8) -> Self {
        self.item(8, GLOBAL, &[id])
    }

    pub fn report_count(self, count: u32) -> Self {
        self.item(9, GLOBAL, &unsigned_bytes(count))
    }

    pub fn push(self) -> Self {
        self.item(10, GLOBAL, &[])
    }

    pub fn pop(self) -> Self {
        self.item(11, GLOBAL, &[])
    }

    /// Usage id on the current usage page.
    pub fn usage(self, id: u16) -> Self {
        self.item(0, LOCAL, &unsigned_bytes(u32::from(id)))
    }

    /// 4-byte usage carrying its own page.
    pub fn usage_ext(self, usage: Usage) -> Self {
        self.item(0, LOCAL, &usage.extended().to_le_bytes())
    }

    pub fn usage_min(self, id: u16) -> Self {
        self.item(1, LOCAL, &unsigned_bytes(u32::from(id)))
    }

    pub fn usage_max(self, id: u16) -> Self {
        self.item(2, LOCAL, &unsigned_bytes(u32::from(id)))
    }

    pub fn input(self, flags: u32) -> Self {
        self.item(8, MAIN, &unsigned_bytes(flags))
    }

    pub fn output(self, flags: u32) -> Self {
        self.item(9, MAIN, &unsigned_bytes(flags))
    }

    pub fn feature(self, flags: u32) -> Self {
        self.item(11, MAIN, &unsigned_bytes(flags))
    }

    pub fn collection(self, kind: u8) -> Self {
        self.item(10, MAIN, &[kind])
    }

    pub fn end_collection(self) -> Self {
        self.item(12, MAIN, &[])
    }

    /// Usage page, usage and an Application collection.
    pub fn application(self, usage: Usage) -> Self {
        self.usage_page(usage.page)
            .usage(usage.id)
            .collection(collection::APPLICATION)
    }

    pub fn long_item(mut self, tag: u8, data: &[u8]) -> Self {
        self.bytes.push(0xFE);
        self.bytes.push(data.len() as u8);
        self.bytes.push(tag);
        self.bytes.extend_from_slice(data);
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}
