//! Usage maps for digitizer and pen top-level collections.

use hmap::codes::{
    ABS_PRESSURE, ABS_TILT_X, ABS_TILT_Y, ABS_X, ABS_Y, BTN_STYLUS, BTN_STYLUS2, BTN_TOOL_PEN,
    BTN_TOOL_RUBBER, BTN_TOUCH, EV_PWR, INPUT_PROP_DIRECT, INPUT_PROP_POINTER,
};
use hmap::usage::{digitizers, generic_desktop};
use hmap::{CallbackError, CallbackResult, CallbackState, EvdevSink, MapItem, UsageMap};
use tracing::trace;

/// Generic Digitizers page map (HUT 1.12).
pub static DIGITIZER_MAP: UsageMap = &[
    MapItem::abs("X", generic_desktop::X, ABS_X).required(),
    MapItem::abs("Y", generic_desktop::Y, ABS_Y).required(),
    MapItem::abs("TIP_PRESSURE", digitizers::TIP_PRESSURE, ABS_PRESSURE),
    MapItem::abs("X_TILT", digitizers::X_TILT, ABS_TILT_X),
    MapItem::abs("Y_TILT", digitizers::Y_TILT, ABS_TILT_Y),
    MapItem::abs_cb("BATTERY_STRENGTH", digitizers::BATTERY_STRENGTH, battery_strength_cb),
    MapItem::key("TOUCH", digitizers::TOUCH, BTN_TOUCH),
    MapItem::key("TIP_SWITCH", digitizers::TIP_SWITCH, BTN_TOUCH),
    MapItem::key("SEC_TIP_SWITCH", digitizers::SEC_TIP_SWITCH, BTN_TOUCH),
    MapItem::key("IN_RANGE", digitizers::IN_RANGE, BTN_TOOL_PEN),
    MapItem::key("BARREL_SWITCH", digitizers::BARREL_SWITCH, BTN_STYLUS),
    MapItem::key("INVERT", digitizers::INVERT, BTN_TOOL_RUBBER),
    MapItem::key("ERASER", digitizers::ERASER, BTN_TOUCH),
    MapItem::key("TABLET_PICK", digitizers::TABLET_PICK, BTN_STYLUS2),
    MapItem::key("SEC_BARREL_SWITCH", digitizers::SEC_BARREL_SWITCH, BTN_STYLUS2),
    MapItem::completion("DIGITIZER_PROPS", digitizer_completion_cb),
];

/// Microsoft-standardized pen.
pub static PEN_MAP: UsageMap = &[
    MapItem::abs("X", generic_desktop::X, ABS_X).required(),
    MapItem::abs("Y", generic_desktop::Y, ABS_Y).required(),
    MapItem::abs("TIP_PRESSURE", digitizers::TIP_PRESSURE, ABS_PRESSURE).required(),
    MapItem::abs("X_TILT", digitizers::X_TILT, ABS_TILT_X),
    MapItem::abs("Y_TILT", digitizers::Y_TILT, ABS_TILT_Y),
    MapItem::abs_cb("BATTERY_STRENGTH", digitizers::BATTERY_STRENGTH, battery_strength_cb),
    MapItem::key("TIP_SWITCH", digitizers::TIP_SWITCH, BTN_TOUCH).required(),
    MapItem::key("IN_RANGE", digitizers::IN_RANGE, BTN_TOOL_PEN).required(),
    MapItem::key("BARREL_SWITCH", digitizers::BARREL_SWITCH, BTN_STYLUS),
    MapItem::key("INVERT", digitizers::INVERT, BTN_TOOL_RUBBER).required(),
    MapItem::key("ERASER", digitizers::ERASER, BTN_TOUCH).required(),
    MapItem::completion("PEN_PROPS", pen_completion_cb),
];

/// Announces `EV_PWR`. Battery values are not reported yet.
fn battery_strength_cb(sink: &mut dyn EvdevSink, state: CallbackState<'_>) -> CallbackResult {
    match state {
        CallbackState::Attaching => sink.support_event(EV_PWR),
        CallbackState::Running { value, .. } => trace!("battery strength {}", value),
        CallbackState::ReportDone | CallbackState::Detaching => {}
    }
    Ok(())
}

fn announce_prop(sink: &mut dyn EvdevSink, state: CallbackState<'_>, prop: u16) -> CallbackResult {
    if matches!(state, CallbackState::Attaching) {
        sink.support_prop(prop);
    }
    // Nothing to do per report or at detach.
    Err(CallbackError::AttachOnly)
}

fn digitizer_completion_cb(sink: &mut dyn EvdevSink, state: CallbackState<'_>) -> CallbackResult {
    announce_prop(sink, state, INPUT_PROP_POINTER)
}

fn pen_completion_cb(sink: &mut dyn EvdevSink, state: CallbackState<'_>) -> CallbackResult {
    announce_prop(sink, state, INPUT_PROP_DIRECT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pen_map_required_rows() {
        let required: Vec<&str> = PEN_MAP
            .iter()
            .filter(|row| row.required)
            .map(|row| row.name)
            .collect();
        assert_eq!(
            required,
            vec!["X", "Y", "TIP_PRESSURE", "TIP_SWITCH", "IN_RANGE", "INVERT", "ERASER"]
        );
    }

    #[test]
    fn test_digitizer_map_only_requires_position() {
        assert_eq!(DIGITIZER_MAP.iter().filter(|row| row.required).count(), 2);
    }

    #[test]
    fn test_maps_end_with_completion() {
        assert!(PEN_MAP.last().is_some_and(MapItem::is_completion));
        assert!(DIGITIZER_MAP.last().is_some_and(MapItem::is_completion));
    }
}
