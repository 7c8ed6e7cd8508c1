//! Canned report descriptors and usage maps.

use hmap::codes::{
    BTN_LEFT, BTN_MIDDLE, BTN_RIGHT, KEY_A, KEY_B, KEY_C, KEY_D, KEY_MUTE, KEY_PLAYPAUSE,
    KEY_VOLUMEDOWN, KEY_VOLUMEUP, REL_X, REL_Y,
};
use hmap::usage::{button, consumer, digitizers, generic_desktop, keyboard, page};
use hmap::{Hmap, HmapResult, MapItem, UsageMap};

use crate::builder::{DescriptorBuilder, collection, input};
use crate::mock::{MockTransport, RecordingSink};

/// Three buttons, 5 bits of padding, relative X/Y bytes. No report ID.
pub fn mouse_descriptor() -> Vec<u8> {
    DescriptorBuilder::new()
        .application(generic_desktop::MOUSE)
        .usage_page(page::BUTTON)
        .usage_min(1)
        .usage_max(3)
        .logical_min(0)
        .logical_max(1)
        .report_size(1)
        .report_count(3)
        .input(input::DATA_VAR_ABS)
        .report_size(5)
        .report_count(1)
        .input(input::CONSTANT)
        .usage_page(page::GENERIC_DESKTOP)
        .usage(generic_desktop::X.id)
        .usage(generic_desktop::Y.id)
        .logical_min(-127)
        .logical_max(127)
        .report_size(8)
        .report_count(2)
        .input(input::DATA_VAR_REL)
        .end_collection()
        .build()
}

pub static MOUSE_MAP: UsageMap = &[
    MapItem::key("BTN_LEFT", button(1), BTN_LEFT),
    MapItem::key("BTN_RIGHT", button(2), BTN_RIGHT),
    MapItem::key("BTN_MIDDLE", button(3), BTN_MIDDLE),
    MapItem::rel("X", generic_desktop::X, REL_X).required(),
    MapItem::rel("Y", generic_desktop::Y, REL_Y).required(),
];

fn keyboard_array(builder: DescriptorBuilder) -> DescriptorBuilder {
    builder
        .usage_page(page::KEYBOARD)
        .usage_min(0x04)
        .usage_max(0x07)
        .logical_min(0x04)
        .logical_max(0x07)
        .report_size(8)
        .report_count(6)
        .input(input::DATA_ARRAY_ABS)
}

/// Six 8-bit key slots over the Keyboard page range 0x04..=0x07; slot values
/// are the usage ids.
pub fn keyboard_descriptor() -> Vec<u8> {
    keyboard_array(DescriptorBuilder::new().application(generic_desktop::KEYBOARD))
        .end_collection()
        .build()
}

pub static KEYBOARD_MAP: UsageMap = &[
    MapItem::key("KEY_A", keyboard(0x04), KEY_A),
    MapItem::key("KEY_B", keyboard(0x05), KEY_B),
    MapItem::key("KEY_C", keyboard(0x06), KEY_C),
    MapItem::key("KEY_D", keyboard(0x07), KEY_D),
];

pub static CONSUMER_MAP: UsageMap = &[
    MapItem::key("MUTE", consumer::MUTE, KEY_MUTE),
    MapItem::key("VOLUME_UP", consumer::VOLUME_INCREMENT, KEY_VOLUMEUP),
    MapItem::key("VOLUME_DOWN", consumer::VOLUME_DECREMENT, KEY_VOLUMEDOWN),
    MapItem::key("PLAY_PAUSE", consumer::PLAY_PAUSE, KEY_PLAYPAUSE),
];

/// Report 1: keyboard range array. Report 2: two consumer list slots.
pub fn multi_report_descriptor() -> Vec<u8> {
    let builder = DescriptorBuilder::new()
        .application(generic_desktop::KEYBOARD)
        .report_id(1);
    keyboard_array(builder)
        .end_collection()
        .application(consumer::CONSUMER_CONTROL)
        .report_id(2)
        .usage(consumer::MUTE.id)
        .usage(consumer::VOLUME_INCREMENT.id)
        .usage(consumer::VOLUME_DECREMENT.id)
        .usage(consumer::PLAY_PAUSE.id)
        .logical_min(1)
        .logical_max(4)
        .report_size(8)
        .report_count(2)
        .input(input::DATA_ARRAY_ABS)
        .end_collection()
        .build()
}

fn pen_axes(builder: DescriptorBuilder, with_pressure: bool) -> DescriptorBuilder {
    let builder = builder
        .usage_page(page::GENERIC_DESKTOP)
        .usage(generic_desktop::X.id)
        .usage(generic_desktop::Y.id)
        .logical_min(0)
        .logical_max(32767)
        .report_size(16)
        .report_count(2)
        .input(input::DATA_VAR_ABS);
    if with_pressure {
        builder
            .usage_page(page::DIGITIZERS)
            .usage(digitizers::TIP_PRESSURE.id)
            .logical_max(1023)
            .report_count(1)
            .input(input::DATA_VAR_ABS)
    } else {
        builder
    }
}

fn pen_buttons(builder: DescriptorBuilder) -> DescriptorBuilder {
    builder
        .usage_page(page::DIGITIZERS)
        .usage(digitizers::TIP_SWITCH.id)
        .usage(digitizers::IN_RANGE.id)
        .usage(digitizers::INVERT.id)
        .usage(digitizers::ERASER.id)
        .logical_min(0)
        .logical_max(1)
        .report_size(1)
        .report_count(4)
        .input(input::DATA_VAR_ABS)
        .report_count(4)
        .input(input::CONSTANT)
}

fn pen(with_pressure: bool) -> Vec<u8> {
    let builder = DescriptorBuilder::new()
        .application(digitizers::PEN)
        .usage(digitizers::STYLUS.id)
        .collection(collection::PHYSICAL);
    pen_buttons(pen_axes(builder, with_pressure))
        .end_collection()
        .end_collection()
        .build()
}

/// Pen with 16-bit X, Y and pressure, then TipSwitch (bit 0), InRange,
/// Invert and Eraser (bit 3). Seven-byte reports, no report ID.
pub fn pen_descriptor() -> Vec<u8> {
    pen(true)
}

/// The pen layout without a TipPressure field.
pub fn pen_descriptor_without_pressure() -> Vec<u8> {
    pen(false)
}

/// Pen report payload.
pub fn pen_report(x: u16, y: u16, pressure: u16, buttons: u8) -> Vec<u8> {
    let mut report = Vec::with_capacity(7);
    report.extend_from_slice(&x.to_le_bytes());
    report.extend_from_slice(&y.to_le_bytes());
    report.extend_from_slice(&pressure.to_le_bytes());
    report.push(buttons);
    report
}

/// Power down, sleep and wake-up as one-bit variables.
pub fn system_control_descriptor() -> Vec<u8> {
    DescriptorBuilder::new()
        .application(generic_desktop::SYSTEM_CONTROL)
        .usage_min(generic_desktop::SYSTEM_POWER_DOWN.id)
        .usage_max(generic_desktop::SYSTEM_WAKEUP.id)
        .logical_min(0)
        .logical_max(1)
        .report_size(1)
        .report_count(3)
        .input(input::DATA_VAR_ABS)
        .report_size(5)
        .report_count(1)
        .input(input::CONSTANT)
        .end_collection()
        .build()
}

/// Build, add maps and attach a device over the mock transport.
pub fn attached(
    descriptor: impl Into<Vec<u8>>,
    maps: &[UsageMap],
) -> HmapResult<Hmap<MockTransport, RecordingSink>> {
    let mut hmap = Hmap::new(MockTransport::new(descriptor), RecordingSink::new());
    for map in maps {
        hmap.add_map(*map)?;
    }
    hmap.attach()?;
    Ok(hmap)
}
