//! Binds usage maps to parsed descriptor items and builds the dispatch plan.

use crate::caps::Caps;
use crate::codes::{EV_ABS, EV_KEY, EV_REL};
use crate::descriptor::{ItemKind, ParsedItem};
use crate::error::{HmapError, HmapResult};
use crate::location::Location;
use crate::map::{MapCallback, MapItem, Payload, UsageMap};
use crate::sink::{AbsInfo, EvdevSink};
use crate::usage::Usage;
use std::collections::HashMap;
use tracing::debug;

/// Largest accepted usage map.
pub const MAX_MAP_ROWS: usize = 1024;

/// Per-slot key tracking for array records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayKeys {
    /// Code held by each slot after the previous report; 0 = none.
    pub(crate) last: Vec<u16>,
    /// Codes of the report being dispatched.
    pub(crate) current: Vec<u16>,
}

impl ArrayKeys {
    fn new(count: u16) -> Self {
        Self {
            last: vec![0; usize::from(count)],
            current: vec![0; usize::from(count)],
        }
    }

    pub fn last_keys(&self) -> &[u16] {
        &self.last
    }
}

/// One element of the dispatch plan.
#[derive(Debug, Clone)]
pub enum DispatchRecord {
    Callback {
        map: usize,
        row: &'static MapItem,
        callback: MapCallback,
        usage: Usage,
        location: Location,
        attach_only: bool,
    },
    Variable {
        map: usize,
        row: &'static MapItem,
        ev_type: u16,
        code: u16,
        location: Location,
    },
    /// Key rows of one report sharing a code; pressed while any field is set.
    KeyGroup {
        map: usize,
        code: u16,
        location: Location,
        others: Vec<Location>,
    },
    ArrayList {
        map: usize,
        location: Location,
        usages: Vec<Usage>,
        /// Key code per usage, 0 when the usage has no key row.
        codes: Vec<u16>,
        keys: ArrayKeys,
    },
    ArrayRange {
        map: usize,
        location: Location,
        usage_min: Usage,
        usage_max: Usage,
        /// Key code per usage id in `usage_min..=usage_max`.
        codes: Vec<u16>,
        keys: ArrayKeys,
    },
}

impl DispatchRecord {
    pub fn map(&self) -> usize {
        match *self {
            Self::Callback { map, .. }
            | Self::Variable { map, .. }
            | Self::KeyGroup { map, .. }
            | Self::ArrayList { map, .. }
            | Self::ArrayRange { map, .. } => map,
        }
    }

    /// Location of the record; the first field for a key group.
    pub fn location(&self) -> &Location {
        match self {
            Self::Callback { location, .. }
            | Self::Variable { location, .. }
            | Self::KeyGroup { location, .. }
            | Self::ArrayList { location, .. }
            | Self::ArrayRange { location, .. } => location,
        }
    }

    pub fn report_id(&self) -> u8 {
        self.location().report_id
    }

    /// Fold another field of the same key code into this record.
    fn absorb(&mut self, extra: Location) {
        match self {
            Self::Variable {
                map,
                code,
                location,
                ..
            } => {
                let (map, code, location) = (*map, *code, *location);
                *self = Self::KeyGroup {
                    map,
                    code,
                    location,
                    others: vec![extra],
                };
            }
            Self::KeyGroup { others, .. } => others.push(extra),
            _ => {}
        }
    }

    pub fn last_keys(&self) -> Option<&[u16]> {
        match self {
            Self::ArrayList { keys, .. } | Self::ArrayRange { keys, .. } => Some(keys.last_keys()),
            _ => None,
        }
    }
}

/// A completion row of a registered map.
#[derive(Debug, Clone)]
pub struct CompletionRecord {
    pub map: usize,
    pub row: &'static MapItem,
    pub callback: MapCallback,
    pub attach_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub records: Vec<DispatchRecord>,
    pub completions: Vec<CompletionRecord>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.completions.is_empty()
    }
}

/// Event types and codes the plan can produce, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Announcements {
    pub events: Vec<u16>,
    pub keys: Vec<u16>,
    pub rels: Vec<u16>,
    pub abs: Vec<(u16, AbsInfo)>,
}

impl Announcements {
    fn add(&mut self, ev_type: u16, code: u16, location: &Location) {
        if !self.events.contains(&ev_type) {
            self.events.push(ev_type);
        }
        match ev_type {
            EV_KEY if !self.keys.contains(&code) => self.keys.push(code),
            EV_REL if !self.rels.contains(&code) => self.rels.push(code),
            EV_ABS if !self.abs.iter().any(|(c, _)| *c == code) => self
                .abs
                .push((code, AbsInfo::new(location.logical_min, location.logical_max))),
            _ => {}
        }
    }

    /// Announce everything to `sink`: event types first, then codes.
    pub fn apply(&self, sink: &mut dyn EvdevSink) {
        for &ev_type in &self.events {
            sink.support_event(ev_type);
        }
        for &code in &self.keys {
            sink.support_key(code);
        }
        for &code in &self.rels {
            sink.support_rel(code);
        }
        for &(code, info) in &self.abs {
            sink.support_abs(code, info);
        }
    }
}

/// Result of binding one map.
#[derive(Debug, Clone)]
pub struct MapResolution {
    pub records: Vec<DispatchRecord>,
    pub completions: Vec<CompletionRecord>,
    pub caps: Caps,
}

/// Result of binding every registered map.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub plan: Plan,
    pub caps: Vec<Caps>,
    pub announcements: Announcements,
}

fn key_lookup(rows: UsageMap) -> HashMap<Usage, (usize, u16)> {
    let mut lookup = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        if let Payload::Event {
            ev_type: EV_KEY,
            code,
        } = row.payload
        {
            lookup.entry(row.usage).or_insert((idx, code));
        }
    }
    lookup
}

/// Bind one map against the parsed items.
///
/// # Errors
///
/// Returns [`HmapError::RequiredRowUnbound`] when a required row matched
/// nothing, or [`HmapError::Resource`] when the map is too large.
pub fn resolve_map(map: usize, rows: UsageMap, items: &[ParsedItem]) -> HmapResult<MapResolution> {
    if rows.len() > MAX_MAP_ROWS {
        return Err(HmapError::Resource(format!(
            "usage map has {} rows, limit is {}",
            rows.len(),
            MAX_MAP_ROWS
        )));
    }

    let lookup = key_lookup(rows);
    let mut caps = Caps::new(rows.len());
    let mut records = Vec::new();
    let mut completions = Vec::new();

    for item in items {
        match &item.kind {
            ItemKind::Padding => {}
            ItemKind::Variable(usage) => {
                let relative = item.is_relative();
                let found = rows.iter().enumerate().find(|(_, row)| {
                    row.usage == *usage && !row.is_completion() && row.relabs.admits(relative)
                });
                let Some((idx, row)) = found else {
                    continue;
                };
                caps.set(idx);
                match row.payload {
                    Payload::Event { ev_type, code } => records.push(DispatchRecord::Variable {
                        map,
                        row,
                        ev_type,
                        code,
                        location: item.location,
                    }),
                    Payload::Callback(callback) => records.push(DispatchRecord::Callback {
                        map,
                        row,
                        callback,
                        usage: *usage,
                        location: item.location,
                        attach_only: false,
                    }),
                    Payload::Completion(_) => {}
                }
            }
            ItemKind::ArrayList(usages) => {
                let codes: Vec<u16> = usages
                    .iter()
                    .map(|usage| match lookup.get(usage) {
                        Some(&(idx, code)) => {
                            caps.set(idx);
                            code
                        }
                        None => 0,
                    })
                    .collect();
                if codes.iter().any(|&code| code != 0) {
                    records.push(DispatchRecord::ArrayList {
                        map,
                        location: item.location,
                        usages: usages.clone(),
                        codes,
                        keys: ArrayKeys::new(item.location.count),
                    });
                }
            }
            ItemKind::ArrayRange { min, max } => {
                let codes: Vec<u16> = (min.id..=max.id)
                    .map(|id| match lookup.get(&Usage::new(min.page, id)) {
                        Some(&(idx, code)) => {
                            caps.set(idx);
                            code
                        }
                        None => 0,
                    })
                    .collect();
                if codes.iter().any(|&code| code != 0) {
                    records.push(DispatchRecord::ArrayRange {
                        map,
                        location: item.location,
                        usage_min: *min,
                        usage_max: *max,
                        codes,
                        keys: ArrayKeys::new(item.location.count),
                    });
                }
            }
        }
    }

    for (idx, row) in rows.iter().enumerate() {
        if let Payload::Completion(callback) = row.payload {
            caps.set(idx);
            completions.push(CompletionRecord {
                map,
                row,
                callback,
                attach_only: false,
            });
        }
    }

    if let Some(row) = rows
        .iter()
        .enumerate()
        .find(|(idx, row)| row.required && !caps.is_set(*idx))
        .map(|(_, row)| row)
    {
        debug!("Required row {} of map {} is not bound", row.name, map);
        return Err(HmapError::RequiredRowUnbound { name: row.name });
    }

    debug!(
        "Map {}: {} of {} rows bound, {} dispatch records",
        map,
        caps.count(),
        rows.len(),
        records.len()
    );

    Ok(MapResolution {
        records,
        completions,
        caps,
    })
}

/// Collapse variable key records that share a report ID and key code into
/// one [`DispatchRecord::KeyGroup`] at the position of the first.
fn merge_shared_keys(records: Vec<DispatchRecord>) -> Vec<DispatchRecord> {
    let mut merged: Vec<DispatchRecord> = Vec::with_capacity(records.len());
    let mut first: HashMap<(u8, u16), usize> = HashMap::new();

    for record in records {
        if let DispatchRecord::Variable {
            ev_type: EV_KEY,
            code,
            location,
            ..
        } = &record
        {
            let key = (location.report_id, *code);
            if let Some(target) = first.get(&key).and_then(|&idx| merged.get_mut(idx)) {
                target.absorb(*location);
                continue;
            }
            first.insert(key, merged.len());
        }
        merged.push(record);
    }
    merged
}

/// Bind every map, concatenating records in registration order.
///
/// # Errors
///
/// Fails with the first error of [`resolve_map`].
pub fn resolve(maps: &[UsageMap], items: &[ParsedItem]) -> HmapResult<Resolution> {
    let mut plan = Plan::default();
    let mut caps = Vec::with_capacity(maps.len());

    for (idx, rows) in maps.iter().enumerate() {
        let resolved = resolve_map(idx, rows, items)?;
        plan.records.extend(resolved.records);
        plan.completions.extend(resolved.completions);
        caps.push(resolved.caps);
    }
    plan.records = merge_shared_keys(plan.records);

    let mut announcements = Announcements::default();
    for record in &plan.records {
        match record {
            DispatchRecord::Variable {
                ev_type,
                code,
                location,
                ..
            } => announcements.add(*ev_type, *code, location),
            DispatchRecord::KeyGroup { code, location, .. } => {
                announcements.add(EV_KEY, *code, location);
            }
            DispatchRecord::ArrayList {
                codes, location, ..
            }
            | DispatchRecord::ArrayRange {
                codes, location, ..
            } => {
                for &code in codes.iter().filter(|&&code| code != 0) {
                    announcements.add(EV_KEY, code, location);
                }
            }
            DispatchRecord::Callback { .. } => {}
        }
    }

    Ok(Resolution {
        plan,
        caps,
        announcements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{
        ABS_X, BTN_LEFT, BTN_RIGHT, BTN_TOOL_PEN, BTN_TOUCH, EV_MSC, KEY_A, KEY_B, REL_X,
    };
    use crate::descriptor::{MainFlags, parse_descriptor};
    use crate::error::CallbackResult;
    use crate::map::{CallbackState, RelAbs};
    use crate::usage::{button, digitizers, generic_desktop, keyboard};

    fn cb(_sink: &mut dyn EvdevSink, _state: CallbackState<'_>) -> CallbackResult {
        Ok(())
    }

    fn variable(usage: Usage, offset: u32, relative: bool) -> ParsedItem {
        let mut flags = MainFlags::VARIABLE;
        if relative {
            flags |= MainFlags::RELATIVE;
        }
        ParsedItem {
            location: Location {
                report_id: 0,
                bit_offset: offset,
                bit_width: 8,
                count: 1,
                logical_min: -127,
                logical_max: 127,
                is_signed: true,
            },
            kind: ItemKind::Variable(usage),
            flags,
        }
    }

    static POINTER_MAP: UsageMap = &[
        MapItem::key("LEFT", button(1), BTN_LEFT),
        MapItem::key("RIGHT", button(2), BTN_RIGHT),
        MapItem::rel("X", generic_desktop::X, REL_X),
        MapItem::abs("X_ABS", generic_desktop::X, ABS_X),
        MapItem::abs_cb("Z", generic_desktop::Z, cb),
        MapItem::completion("DONE", cb),
    ];

    #[test]
    fn test_variable_binding_respects_relabs() -> HmapResult<()> {
        let items = [
            variable(generic_desktop::X, 0, true),
            variable(generic_desktop::X, 8, false),
        ];
        let resolved = resolve_map(0, POINTER_MAP, &items)?;
        let codes: Vec<_> = resolved
            .records
            .iter()
            .filter_map(|r| match r {
                DispatchRecord::Variable { ev_type, code, .. } => Some((*ev_type, *code)),
                _ => None,
            })
            .collect();
        assert_eq!(codes, vec![(EV_REL, REL_X), (EV_ABS, ABS_X)]);
        assert!(resolved.caps.is_set(2));
        assert!(resolved.caps.is_set(3));
        assert!(!resolved.caps.is_set(0));
        assert!(resolved.caps.is_set(5));
        assert_eq!(resolved.completions.len(), 1);
        Ok(())
    }

    #[test]
    fn test_callback_binding() -> HmapResult<()> {
        let items = [variable(generic_desktop::Z, 0, false)];
        let resolved = resolve_map(0, POINTER_MAP, &items)?;
        assert!(matches!(
            resolved.records.first(),
            Some(DispatchRecord::Callback { usage, .. }) if *usage == generic_desktop::Z
        ));
        Ok(())
    }

    #[test]
    fn test_absolute_callback_row_rejects_relative_item() -> HmapResult<()> {
        let items = [variable(generic_desktop::Z, 0, true)];
        let resolved = resolve_map(0, POINTER_MAP, &items)?;
        assert!(resolved.records.is_empty());
        assert!(!resolved.caps.is_set(4));
        Ok(())
    }

    #[test]
    fn test_required_row_unbound() {
        static MAP: UsageMap = &[
            MapItem::rel("X", generic_desktop::X, REL_X),
            MapItem::rel("WHEEL", generic_desktop::WHEEL, REL_X).required(),
        ];
        let items = [variable(generic_desktop::X, 0, true)];
        assert_eq!(
            resolve_map(0, MAP, &items).err(),
            Some(HmapError::RequiredRowUnbound { name: "WHEEL" })
        );
    }

    #[test]
    fn test_array_range_binding() -> Result<(), Box<dyn std::error::Error>> {
        static KEYS: UsageMap = &[
            MapItem::key("A", keyboard(0x04), KEY_A),
            MapItem::key("B", keyboard(0x05), KEY_B),
            MapItem::rel("X", generic_desktop::X, REL_X),
        ];
        let desc = [
            0x05, 0x07, 0x19, 0x00, 0x29, 0x65, 0x15, 0x00, 0x25, 0x65, 0x75, 0x08, 0x95, 0x06,
            0x81, 0x00,
        ];
        let parsed = parse_descriptor(&desc)?;
        let resolved = resolve_map(0, KEYS, &parsed.items)?;
        assert_eq!(resolved.records.len(), 1);
        match resolved.records.first() {
            Some(DispatchRecord::ArrayRange { codes, keys, .. }) => {
                assert_eq!(codes.len(), 0x66);
                assert_eq!(codes.get(4), Some(&KEY_A));
                assert_eq!(codes.get(5), Some(&KEY_B));
                assert_eq!(keys.last_keys(), &[0; 6]);
            }
            other => return Err(format!("unexpected record {other:?}").into()),
        }
        assert_eq!(resolved.caps.iter().collect::<Vec<_>>(), vec![0, 1]);
        Ok(())
    }

    #[test]
    fn test_array_without_key_rows_produces_no_record() -> Result<(), Box<dyn std::error::Error>> {
        let desc = [
            0x05, 0x07, 0x19, 0x04, 0x29, 0x07, 0x75, 0x08, 0x95, 0x02, 0x81, 0x00,
        ];
        let parsed = parse_descriptor(&desc)?;
        let resolved = resolve_map(0, POINTER_MAP, &parsed.items)?;
        assert!(resolved.records.is_empty());
        Ok(())
    }

    #[test]
    fn test_resolve_concatenates_maps_and_announces_once() -> HmapResult<()> {
        static SECOND: UsageMap = &[MapItem::rel("X2", generic_desktop::X, REL_X)];
        let items = [
            variable(generic_desktop::X, 0, true),
            variable(generic_desktop::X, 8, false),
        ];
        let resolution = resolve(&[POINTER_MAP, SECOND], &items)?;
        assert_eq!(resolution.plan.records.len(), 3);
        assert_eq!(resolution.plan.records.last().map(DispatchRecord::map), Some(1));
        assert_eq!(resolution.caps.len(), 2);
        assert_eq!(resolution.announcements.events, vec![EV_REL, EV_ABS]);
        assert_eq!(resolution.announcements.rels, vec![REL_X]);
        assert_eq!(
            resolution.announcements.abs,
            vec![(ABS_X, AbsInfo::new(-127, 127))]
        );
        Ok(())
    }

    #[test]
    fn test_shared_key_codes_merge_per_report() -> HmapResult<()> {
        static MAP: UsageMap = &[
            MapItem::key("TIP", digitizers::TIP_SWITCH, BTN_TOUCH),
            MapItem::key("IN_RANGE", digitizers::IN_RANGE, BTN_TOOL_PEN),
            MapItem::key("ERASER", digitizers::ERASER, BTN_TOUCH),
        ];
        let mut second_report = variable(digitizers::ERASER, 0, false);
        second_report.location.report_id = 2;
        let items = [
            variable(digitizers::TIP_SWITCH, 0, false),
            variable(digitizers::IN_RANGE, 8, false),
            variable(digitizers::ERASER, 16, false),
            second_report,
        ];
        let resolution = resolve(&[MAP], &items)?;
        let records = &resolution.plan.records;
        assert_eq!(records.len(), 3);
        assert!(matches!(
            records.first(),
            Some(DispatchRecord::KeyGroup { code: BTN_TOUCH, location, others, .. })
                if location.bit_offset == 0 && others.len() == 1
        ));
        assert!(matches!(
            records.get(1),
            Some(DispatchRecord::Variable { code: BTN_TOOL_PEN, .. })
        ));
        assert!(matches!(
            records.get(2),
            Some(DispatchRecord::Variable { code: BTN_TOUCH, location, .. })
                if location.report_id == 2
        ));
        assert_eq!(resolution.announcements.keys, vec![BTN_TOUCH, BTN_TOOL_PEN]);
        Ok(())
    }

    #[test]
    fn test_other_event_types_announce_type_only() -> HmapResult<()> {
        static MAP: UsageMap = &[MapItem {
            name: "SCAN",
            usage: generic_desktop::X,
            payload: Payload::Event {
                ev_type: EV_MSC,
                code: 0x04,
            },
            required: false,
            relabs: RelAbs::Any,
        }];
        let resolution = resolve(&[MAP], &[variable(generic_desktop::X, 0, false)])?;
        assert_eq!(resolution.plan.records.len(), 1);
        assert_eq!(
            resolution.announcements,
            Announcements {
                events: vec![EV_MSC],
                ..Announcements::default()
            }
        );
        Ok(())
    }

    #[test]
    fn test_oversized_map_rejected() {
        const ROW: MapItem = MapItem::key("K", keyboard(0x04), KEY_A);
        static BIG: [MapItem; MAX_MAP_ROWS + 1] = [ROW; MAX_MAP_ROWS + 1];
        assert!(matches!(
            resolve_map(0, &BIG, &[]),
            Err(HmapError::Resource(_))
        ));
    }
}
