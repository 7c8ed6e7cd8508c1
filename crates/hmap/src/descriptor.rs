//! HID 1.11 report descriptor parser.
//!
//! [`HidParser`] walks the short/long item stream and yields one
//! [`ParsedItem`] per reportable input field. [`parse_descriptor`] collects
//! the whole stream together with per-report sizes and the usages of the
//! top-level application collections.

use crate::error::DescriptorError;
use crate::location::Location;
use crate::usage::Usage;
use bitflags::bitflags;
use std::collections::{BTreeMap, VecDeque};
use tracing::{trace, warn};

/// Maximum number of outstanding Push items.
pub const MAX_PUSH_DEPTH: usize = 4;

const LONG_ITEM_PREFIX: u8 = 0xFE;

const ITEM_TYPE_MAIN: u8 = 0;
const ITEM_TYPE_GLOBAL: u8 = 1;
const ITEM_TYPE_LOCAL: u8 = 2;

mod main_tag {
    pub const INPUT: u8 = 8;
    pub const OUTPUT: u8 = 9;
    pub const COLLECTION: u8 = 10;
    pub const FEATURE: u8 = 11;
    pub const END_COLLECTION: u8 = 12;
}

mod global_tag {
    pub const USAGE_PAGE: u8 = 0;
    pub const LOGICAL_MINIMUM: u8 = 1;
    pub const LOGICAL_MAXIMUM: u8 = 2;
    pub const PHYSICAL_MINIMUM: u8 = 3;
    pub const PHYSICAL_MAXIMUM: u8 = 4;
    pub const UNIT_EXPONENT: u8 = 5;
    pub const UNIT: u8 = 6;
    pub const REPORT_SIZE: u8 = 7;
    pub const REPORT_ID: u8 = 8;
    pub const REPORT_COUNT: u8 = 9;
    pub const PUSH: u8 = 10;
    pub const POP: u8 = 11;
}

mod local_tag {
    pub const USAGE: u8 = 0;
    pub const USAGE_MINIMUM: u8 = 1;
    pub const USAGE_MAXIMUM: u8 = 2;
}

const COLLECTION_APPLICATION: u32 = 0x01;

bitflags! {
    /// Input/Output/Feature main item data bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MainFlags: u32 {
        const CONSTANT = 1 << 0;
        const VARIABLE = 1 << 1;
        const RELATIVE = 1 << 2;
        const WRAP = 1 << 3;
        const NON_LINEAR = 1 << 4;
        const NO_PREFERRED = 1 << 5;
        const NULL_STATE = 1 << 6;
        const VOLATILE = 1 << 7;
        const BUFFERED_BYTES = 1 << 8;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportKind {
    Input,
    Output,
    Feature,
}

/// How a parsed input field maps to usages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    /// One field bound to one usage.
    Variable(Usage),
    /// Array whose slot values index an explicit usage list (1-based).
    ArrayList(Vec<Usage>),
    /// Array whose slot values are usage ids inside `min..=max`.
    ArrayRange { min: Usage, max: Usage },
    /// Constant or usage-less field.
    Padding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedItem {
    pub location: Location,
    pub kind: ItemKind,
    pub flags: MainFlags,
}

impl ParsedItem {
    pub fn is_relative(&self) -> bool {
        self.flags.contains(MainFlags::RELATIVE)
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self.kind,
            ItemKind::ArrayList(_) | ItemKind::ArrayRange { .. }
        )
    }

    /// Usage of a variable item.
    pub fn usage(&self) -> Option<Usage> {
        match self.kind {
            ItemKind::Variable(usage) => Some(usage),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct GlobalState {
    usage_page: u16,
    logical_min: i32,
    logical_max_signed: i32,
    logical_max_unsigned: u32,
    report_size: u32,
    report_id: u8,
    report_count: u32,
}

impl GlobalState {
    /// Logical maximum is read unsigned unless the minimum is negative.
    fn logical_max(&self) -> i32 {
        if self.logical_min < 0 {
            self.logical_max_signed
        } else {
            i32::try_from(self.logical_max_unsigned).unwrap_or(i32::MAX)
        }
    }
}

#[derive(Debug, Default)]
struct LocalState {
    usages: Vec<Usage>,
    usage_min: Option<Usage>,
    usage_max: Option<Usage>,
}

enum LocalUsages {
    None,
    List(Vec<Usage>),
    Range(Usage, Usage),
}

impl LocalState {
    fn reset(&mut self) {
        self.usages.clear();
        self.usage_min = None;
        self.usage_max = None;
    }

    fn first(&self) -> Option<Usage> {
        self.usages.first().copied().or(self.usage_min)
    }

    /// A complete min/max pair wins over explicit usages; a lone bound is
    /// treated as an explicit usage.
    fn take(&mut self, offset: usize) -> Result<LocalUsages, DescriptorError> {
        match (self.usage_min, self.usage_max) {
            (Some(min), Some(max)) => {
                if min.page != max.page || min.id > max.id {
                    return Err(DescriptorError::InvalidUsageRange { offset, min, max });
                }
                Ok(LocalUsages::Range(min, max))
            }
            (lone_min, lone_max) => {
                let mut usages = std::mem::take(&mut self.usages);
                usages.extend(lone_min.or(lone_max));
                if usages.is_empty() {
                    Ok(LocalUsages::None)
                } else {
                    Ok(LocalUsages::List(usages))
                }
            }
        }
    }
}

fn parse_unsigned(data: &[u8]) -> u32 {
    match *data {
        [b0] => u32::from(b0),
        [b0, b1] => u32::from(u16::from_le_bytes([b0, b1])),
        [b0, b1, b2, b3] => u32::from_le_bytes([b0, b1, b2, b3]),
        _ => 0,
    }
}

fn parse_signed(data: &[u8]) -> i32 {
    match *data {
        [b0] => i32::from(i8::from_le_bytes([b0])),
        [b0, b1] => i32::from(i16::from_le_bytes([b0, b1])),
        [b0, b1, b2, b3] => i32::from_le_bytes([b0, b1, b2, b3]),
        _ => 0,
    }
}

/// Streaming report descriptor parser.
///
/// Yields input items in descriptor order. After the first error the parser
/// yields nothing more.
#[derive(Debug)]
pub struct HidParser<'a> {
    data: &'a [u8],
    pos: usize,
    global: GlobalState,
    stack: Vec<GlobalState>,
    local: LocalState,
    collection_depth: usize,
    cursors: BTreeMap<(ReportKind, u8), u32>,
    pending: VecDeque<ParsedItem>,
    applications: Vec<Usage>,
    uses_report_ids: bool,
    done: bool,
}

impl<'a> HidParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            global: GlobalState::default(),
            stack: Vec::with_capacity(MAX_PUSH_DEPTH),
            local: LocalState::default(),
            collection_depth: 0,
            cursors: BTreeMap::new(),
            pending: VecDeque::new(),
            applications: Vec::new(),
            uses_report_ids: false,
            done: false,
        }
    }

    /// Byte offset of the next item.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn uses_report_ids(&self) -> bool {
        self.uses_report_ids
    }

    /// Usages of the top-level application collections seen so far.
    pub fn applications(&self) -> &[Usage] {
        &self.applications
    }

    /// Consume one descriptor item. Returns `Ok(false)` at end of stream.
    fn step(&mut self) -> Result<bool, DescriptorError> {
        let offset = self.pos;
        let Some(&prefix) = self.data.get(offset) else {
            return Ok(false);
        };

        if prefix == LONG_ITEM_PREFIX {
            let size = self
                .data
                .get(offset.saturating_add(1))
                .copied()
                .ok_or(DescriptorError::Truncated { offset })?;
            let end = offset.saturating_add(3).saturating_add(usize::from(size));
            if end > self.data.len() {
                return Err(DescriptorError::Truncated { offset });
            }
            trace!("Skipping long item at offset {} ({} bytes)", offset, size);
            self.pos = end;
            return Ok(true);
        }

        let size = match prefix & 0x03 {
            0 => 0,
            1 => 1,
            2 => 2,
            _ => 4,
        };
        let item_type = (prefix >> 2) & 0x03;
        let tag = prefix >> 4;

        let start = offset.saturating_add(1);
        let data = self
            .data
            .get(start..start.saturating_add(size))
            .ok_or(DescriptorError::Truncated { offset })?;
        self.pos = start.saturating_add(size);

        match item_type {
            ITEM_TYPE_MAIN => self.main_item(tag, data, offset)?,
            ITEM_TYPE_GLOBAL => self.global_item(tag, data, offset)?,
            ITEM_TYPE_LOCAL => self.local_item(tag, data),
            _ => trace!("Ignoring reserved item type at offset {}", offset),
        }
        Ok(true)
    }

    fn global_item(&mut self, tag: u8, data: &[u8], offset: usize) -> Result<(), DescriptorError> {
        match tag {
            global_tag::USAGE_PAGE => self.global.usage_page = parse_unsigned(data) as u16,
            global_tag::LOGICAL_MINIMUM => self.global.logical_min = parse_signed(data),
            global_tag::LOGICAL_MAXIMUM => {
                self.global.logical_max_signed = parse_signed(data);
                self.global.logical_max_unsigned = parse_unsigned(data);
            }
            global_tag::PHYSICAL_MINIMUM
            | global_tag::PHYSICAL_MAXIMUM
            | global_tag::UNIT_EXPONENT
            | global_tag::UNIT => {}
            global_tag::REPORT_SIZE => self.global.report_size = parse_unsigned(data),
            global_tag::REPORT_ID => {
                let id = parse_unsigned(data);
                match u8::try_from(id) {
                    Ok(report_id) if report_id != 0 => {
                        self.global.report_id = report_id;
                        self.uses_report_ids = true;
                    }
                    _ => return Err(DescriptorError::InvalidReportId { offset, id }),
                }
            }
            global_tag::REPORT_COUNT => self.global.report_count = parse_unsigned(data),
            global_tag::PUSH => {
                if self.stack.len() >= MAX_PUSH_DEPTH {
                    return Err(DescriptorError::StackOverflow {
                        offset,
                        max: MAX_PUSH_DEPTH,
                    });
                }
                self.stack.push(self.global);
            }
            global_tag::POP => {
                self.global = self
                    .stack
                    .pop()
                    .ok_or(DescriptorError::StackUnderflow { offset })?;
            }
            _ => trace!("Ignoring global item tag {} at offset {}", tag, offset),
        }
        Ok(())
    }

    fn local_item(&mut self, tag: u8, data: &[u8]) {
        let usage = if data.len() == 4 {
            Usage::from_extended(parse_unsigned(data))
        } else {
            Usage::new(self.global.usage_page, parse_unsigned(data) as u16)
        };
        match tag {
            local_tag::USAGE => self.local.usages.push(usage),
            local_tag::USAGE_MINIMUM => self.local.usage_min = Some(usage),
            local_tag::USAGE_MAXIMUM => self.local.usage_max = Some(usage),
            // Designator, string and delimiter items.
            _ => {}
        }
    }

    fn main_item(&mut self, tag: u8, data: &[u8], offset: usize) -> Result<(), DescriptorError> {
        let result = match tag {
            main_tag::INPUT => self.input_item(data, offset),
            main_tag::OUTPUT => self
                .advance(ReportKind::Output, offset)
                .map(|_| ()),
            main_tag::FEATURE => self
                .advance(ReportKind::Feature, offset)
                .map(|_| ()),
            main_tag::COLLECTION => {
                if self.collection_depth == 0 && parse_unsigned(data) == COLLECTION_APPLICATION {
                    if let Some(usage) = self.local.first() {
                        self.applications.push(usage);
                    }
                }
                self.collection_depth = self.collection_depth.saturating_add(1);
                Ok(())
            }
            main_tag::END_COLLECTION => match self.collection_depth.checked_sub(1) {
                Some(depth) => {
                    self.collection_depth = depth;
                    Ok(())
                }
                None => Err(DescriptorError::UnbalancedCollection { offset }),
            },
            _ => {
                trace!("Ignoring main item tag {} at offset {}", tag, offset);
                Ok(())
            }
        };
        self.local.reset();
        result
    }

    /// Advance the bit cursor of the current report and return the start
    /// offset of the item.
    fn advance(&mut self, kind: ReportKind, offset: usize) -> Result<u32, DescriptorError> {
        let bits = u64::from(self.global.report_size) * u64::from(self.global.report_count);
        let cursor = self
            .cursors
            .entry((kind, self.global.report_id))
            .or_insert(0);
        let start = *cursor;
        let Ok(end) = u32::try_from(u64::from(start) + bits) else {
            return Err(DescriptorError::ReportTooLong { offset });
        };
        *cursor = end;
        Ok(start)
    }

    fn input_item(&mut self, data: &[u8], offset: usize) -> Result<(), DescriptorError> {
        let flags = MainFlags::from_bits_truncate(parse_unsigned(data));
        let size = self.global.report_size;
        if size > 32 {
            return Err(DescriptorError::ReportSizeTooLarge { offset, size });
        }
        let Ok(count) = u16::try_from(self.global.report_count) else {
            return Err(DescriptorError::ReportTooLong { offset });
        };
        let start = self.advance(ReportKind::Input, offset)?;
        let usages = self.local.take(offset)?;
        if size == 0 || count == 0 {
            return Ok(());
        }

        let logical_min = self.global.logical_min;
        let base = Location {
            report_id: self.global.report_id,
            bit_offset: start,
            bit_width: size as u8,
            count,
            logical_min,
            logical_max: self.global.logical_max(),
            is_signed: logical_min < 0,
        };

        if flags.contains(MainFlags::CONSTANT) {
            self.pending.push_back(ParsedItem {
                location: base,
                kind: ItemKind::Padding,
                flags,
            });
            return Ok(());
        }

        match usages {
            LocalUsages::None => self.pending.push_back(ParsedItem {
                location: base,
                kind: ItemKind::Padding,
                flags,
            }),
            usages if flags.contains(MainFlags::VARIABLE) => {
                for i in 0..count {
                    let usage = match &usages {
                        LocalUsages::List(list) => {
                            let idx = usize::from(i).min(list.len().saturating_sub(1));
                            list.get(idx).copied().unwrap_or_default()
                        }
                        LocalUsages::Range(min, max) => {
                            Usage::new(min.page, min.id.saturating_add(i).min(max.id))
                        }
                        LocalUsages::None => Usage::default(),
                    };
                    let location = Location {
                        bit_offset: start + u32::from(i) * size,
                        count: 1,
                        ..base
                    };
                    self.pending.push_back(ParsedItem {
                        location,
                        kind: ItemKind::Variable(usage),
                        flags,
                    });
                }
            }
            LocalUsages::Range(min, max) => self.pending.push_back(ParsedItem {
                location: base,
                kind: ItemKind::ArrayRange { min, max },
                flags,
            }),
            LocalUsages::List(list) => self.pending.push_back(ParsedItem {
                location: base,
                kind: ItemKind::ArrayList(list),
                flags,
            }),
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), DescriptorError> {
        if !self.stack.is_empty() {
            return Err(DescriptorError::UnbalancedPush {
                offset: self.pos,
                depth: self.stack.len(),
            });
        }
        if self.collection_depth > 0 {
            warn!(
                "Report descriptor ends with {} open collection(s)",
                self.collection_depth
            );
        }
        Ok(())
    }

    /// Consume the parser after iteration and build the summary.
    fn into_descriptor(self, items: Vec<ParsedItem>) -> ParsedDescriptor {
        ParsedDescriptor {
            items,
            report_bits: self.cursors,
            uses_report_ids: self.uses_report_ids,
            applications: self.applications,
        }
    }
}

impl Iterator for HidParser<'_> {
    type Item = Result<ParsedItem, DescriptorError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }
            match self.step() {
                Ok(true) => {}
                Ok(false) => {
                    self.done = true;
                    if let Err(e) = self.finish() {
                        return Some(Err(e));
                    }
                }
                Err(e) => {
                    self.done = true;
                    self.pending.clear();
                    return Some(Err(e));
                }
            }
        }
    }
}

/// A fully parsed report descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDescriptor {
    pub items: Vec<ParsedItem>,
    report_bits: BTreeMap<(ReportKind, u8), u32>,
    uses_report_ids: bool,
    applications: Vec<Usage>,
}

impl ParsedDescriptor {
    pub fn uses_report_ids(&self) -> bool {
        self.uses_report_ids
    }

    pub fn applications(&self) -> &[Usage] {
        &self.applications
    }

    /// Usage of the first top-level application collection.
    pub fn application(&self) -> Option<Usage> {
        self.applications.first().copied()
    }

    pub fn report_bits(&self, kind: ReportKind, report_id: u8) -> Option<u32> {
        self.report_bits.get(&(kind, report_id)).copied()
    }

    /// Payload length in bytes, excluding the report ID byte.
    pub fn report_bytes(&self, kind: ReportKind, report_id: u8) -> Option<usize> {
        self.report_bits(kind, report_id)
            .map(|bits| bits.div_ceil(8) as usize)
    }

    pub fn max_report_bytes(&self, kind: ReportKind) -> usize {
        self.report_bits
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, bits)| bits.div_ceil(8) as usize)
            .max()
            .unwrap_or(0)
    }

    /// Size of a buffer that holds any input report including its ID byte.
    pub fn input_buffer_size(&self) -> usize {
        self.max_report_bytes(ReportKind::Input)
            .saturating_add(usize::from(self.uses_report_ids))
    }

    pub fn input_report_ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.report_bits
            .keys()
            .filter(|(kind, _)| *kind == ReportKind::Input)
            .map(|(_, id)| *id)
    }

    pub fn has_input_report(&self, report_id: u8) -> bool {
        self.report_bits
            .contains_key(&(ReportKind::Input, report_id))
    }
}

/// Parse a complete report descriptor.
///
/// # Errors
///
/// Returns the first [`DescriptorError`] encountered.
pub fn parse_descriptor(data: &[u8]) -> Result<ParsedDescriptor, DescriptorError> {
    let mut parser = HidParser::new(data);
    let items = parser.by_ref().collect::<Result<Vec<_>, _>>()?;
    Ok(parser.into_descriptor(items))
}
