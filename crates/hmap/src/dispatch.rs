//! Per-report dispatch of the plan.
//!
//! Runs in the transport's interrupt path: nothing here allocates.

use crate::codes::{EV_KEY, type_name};
use crate::location::Location;
use crate::map::CallbackState;
use crate::resolve::{ArrayKeys, DispatchRecord, Plan};
use crate::sink::EvdevSink;
use tracing::{debug, warn};

#[inline]
fn emit<E: EvdevSink>(sink: &mut E, ev_type: u16, code: u16, value: i32, debug_level: u8) {
    if debug_level >= 2 {
        debug!("{} code={:#x} value={}", type_name(ev_type), code, value);
    }
    sink.push_event(ev_type, code, value);
}

/// Code bound to a list-array slot value; values are 1-based indices.
fn list_code(codes: &[u16], value: i32) -> u16 {
    usize::try_from(value)
        .ok()
        .and_then(|v| v.checked_sub(1))
        .and_then(|idx| codes.get(idx))
        .copied()
        .unwrap_or(0)
}

/// Code bound to a range-array slot value.
///
/// The slot holds `logical_min + (usage - usage_min)`; `codes` is indexed by
/// `usage - usage_min`. Zero and values outside the logical range are empty.
fn range_code(codes: &[u16], location: &Location, value: i32) -> u16 {
    if value == 0 || value < location.logical_min || value > location.logical_max {
        return 0;
    }
    value
        .checked_sub(location.logical_min)
        .and_then(|idx| usize::try_from(idx).ok())
        .and_then(|idx| codes.get(idx))
        .copied()
        .unwrap_or(0)
}

/// Release keys that left the array, then press keys that entered it.
fn update_keys<E: EvdevSink>(sink: &mut E, keys: &mut ArrayKeys, debug_level: u8) {
    let ArrayKeys { last, current } = keys;

    // A code reported by two slots is held once.
    for i in 1..current.len() {
        let (seen, rest) = current.split_at_mut(i);
        if let Some(code) = rest.first_mut() {
            if *code != 0 && seen.contains(code) {
                *code = 0;
            }
        }
    }

    for &code in last.iter() {
        if code != 0 && !current.contains(&code) {
            emit(sink, EV_KEY, code, 0, debug_level);
        }
    }
    for &code in current.iter() {
        if code != 0 && !last.contains(&code) {
            emit(sink, EV_KEY, code, 1, debug_level);
        }
    }
    last.copy_from_slice(current);
}

/// Dispatch one report. `payload` excludes the report ID byte.
///
/// Records bound to other report IDs are skipped. The report always ends
/// with exactly one `sync()`.
pub fn dispatch_report<E: EvdevSink>(
    plan: &mut Plan,
    sink: &mut E,
    report_id: u8,
    payload: &[u8],
    debug_level: u8,
) {
    if debug_level >= 1 {
        debug!("Report id={} len={}", report_id, payload.len());
    }

    for record in plan.records.iter_mut() {
        if record.report_id() != report_id {
            continue;
        }
        match record {
            DispatchRecord::Callback {
                row,
                callback,
                usage,
                location,
                attach_only,
                ..
            } => {
                if *attach_only {
                    continue;
                }
                let value = location.extract(payload);
                let state = CallbackState::Running {
                    usage: *usage,
                    location,
                    value,
                };
                if let Err(e) = (*callback)(&mut *sink, state) {
                    warn!("Map callback {} failed: {}", row.name, e);
                }
            }
            DispatchRecord::Variable {
                ev_type,
                code,
                location,
                ..
            } => {
                let raw = location.extract(payload);
                let value = if *ev_type == EV_KEY {
                    i32::from(raw != 0)
                } else {
                    raw
                };
                emit(sink, *ev_type, *code, value, debug_level);
            }
            DispatchRecord::KeyGroup {
                code,
                location,
                others,
                ..
            } => {
                let pressed = location.extract(payload) != 0
                    || others.iter().any(|other| other.extract(payload) != 0);
                emit(sink, EV_KEY, *code, i32::from(pressed), debug_level);
            }
            DispatchRecord::ArrayList {
                location,
                codes,
                keys,
                ..
            } => {
                for (slot, current) in (0..location.count).zip(keys.current.iter_mut()) {
                    *current = list_code(codes, location.extract_slot(payload, slot));
                }
                update_keys(sink, keys, debug_level);
            }
            DispatchRecord::ArrayRange {
                location,
                codes,
                keys,
                ..
            } => {
                for (slot, current) in (0..location.count).zip(keys.current.iter_mut()) {
                    let value = location.extract_slot(payload, slot);
                    *current = range_code(codes, location, value);
                }
                update_keys(sink, keys, debug_level);
            }
        }
    }

    for completion in plan.completions.iter() {
        if completion.attach_only {
            continue;
        }
        if let Err(e) = (completion.callback)(&mut *sink, CallbackState::ReportDone) {
            warn!("Completion callback {} failed: {}", completion.row.name, e);
        }
    }

    sink.sync();
}
