//! Attach/detach lifecycle, rollback and callback contract.

use std::sync::atomic::{AtomicUsize, Ordering};

use hmap::codes::{ABS_Z, EV_ABS, INPUT_PROP_BUTTONPAD, KEY_A};
use hmap::usage::{generic_desktop, keyboard, page};
use hmap::{
    CallbackError, CallbackResult, CallbackState, DescriptorError, EvdevSink, Hmap, HmapConfig,
    HmapError, MapItem, SinkError, TransportError, UsageMap,
};
use hmap_test_helpers::prelude::*;

fn mouse() -> Hmap<MockTransport, RecordingSink> {
    init_test_tracing();
    Hmap::new(MockTransport::new(mouse_descriptor()), RecordingSink::new())
}

#[test]
fn test_report_before_attach() {
    let mut hmap = mouse();
    assert_eq!(hmap.handle_report(&[1, 0, 0]), Err(HmapError::NotAttached));
    assert_eq!(hmap.poll(), Err(HmapError::NotAttached));
}

#[test]
fn test_attach_without_maps() {
    let mut hmap = mouse();
    let err = must_err(hmap.attach());
    assert_eq!(err, HmapError::NoMaps);
    assert!(err.is_lifecycle_misuse());
}

#[test]
fn test_double_attach_and_late_map() -> TestResult {
    let mut hmap = mouse();
    hmap.add_map(MOUSE_MAP)?;
    hmap.attach()?;
    assert_eq!(hmap.attach(), Err(HmapError::AlreadyAttached));
    assert!(matches!(
        hmap.add_map(KEYBOARD_MAP),
        Err(HmapError::AlreadyAttached)
    ));
    assert_eq!(hmap.map_count(), 1);
    Ok(())
}

#[test]
fn test_attach_starts_transport_with_input_size() -> TestResult {
    let hmap = attached(multi_report_descriptor(), &[KEYBOARD_MAP, CONSUMER_MAP])?;
    // Largest input report is 6 bytes, plus the report ID byte.
    assert_eq!(hmap.transport().started, Some(7));
    assert!(hmap.sink().is_registered());
    assert_eq!(hmap.sink().inner().register_calls, 1);
    Ok(())
}

#[test]
fn test_detach_is_idempotent() -> TestResult {
    let mut hmap = attached(mouse_descriptor(), &[MOUSE_MAP])?;
    hmap.detach();
    hmap.detach();

    assert!(!hmap.is_attached());
    assert_eq!(hmap.transport().stop_calls, 1);
    assert_eq!(hmap.sink().inner().unregister_calls, 1);
    assert!(!hmap.sink().inner().registered);
    assert_eq!(hmap.handle_report(&[1, 0, 0]), Err(HmapError::NotAttached));
    Ok(())
}

#[test]
fn test_reattach_after_detach() -> TestResult {
    let mut hmap = attached(mouse_descriptor(), &[MOUSE_MAP])?;
    hmap.handle_report(&[1, 0, 0])?;
    hmap.detach();
    hmap.attach()?;

    // Key state was reset by detach, so the held button is reported again.
    hmap.handle_report(&[1, 0, 0])?;
    assert_eq!(hmap.sink().inner().sync_count(), 2);
    assert_eq!(hmap.sink().inner().events().len(), 2);
    assert_eq!(hmap.transport().descriptor_reads, 1);
    Ok(())
}

#[test]
fn test_sink_registration_failure_rolls_back() {
    init_test_tracing();
    let mut hmap = Hmap::new(
        MockTransport::new(mouse_descriptor()),
        RecordingSink::failing_register("no minor numbers"),
    );
    must(hmap.add_map(MOUSE_MAP));

    assert_eq!(
        hmap.attach(),
        Err(HmapError::Sink(SinkError::RegistrationFailed(
            "no minor numbers".to_string()
        )))
    );
    assert!(!hmap.is_attached());
    assert_eq!(hmap.transport().start_calls, 0);
    assert!(!hmap.sink().supports_event(hmap::codes::EV_REL));
}

#[test]
fn test_transport_start_failure_rolls_back() {
    init_test_tracing();
    let transport =
        MockTransport::new(mouse_descriptor()).with_failing_start(TransportError::Disconnected);
    let mut hmap = Hmap::new(transport, RecordingSink::new());
    must(hmap.add_map(MOUSE_MAP));

    assert_eq!(
        hmap.attach(),
        Err(HmapError::Transport(TransportError::Disconnected))
    );
    assert!(!hmap.is_attached());
    assert!(!hmap.sink().is_registered());
    assert_eq!(hmap.sink().inner().register_calls, 1);
    assert_eq!(hmap.sink().inner().unregister_calls, 1);
}

#[test]
fn test_descriptor_fetch_failure() {
    init_test_tracing();
    let transport = MockTransport::new(mouse_descriptor())
        .with_failing_descriptor(TransportError::ReadError("nak".to_string()));
    let mut hmap = Hmap::new(transport, RecordingSink::new());
    assert!(matches!(
        hmap.add_map(MOUSE_MAP),
        Err(HmapError::Transport(TransportError::ReadError(_)))
    ));
}

#[test]
fn test_malformed_descriptor() {
    init_test_tracing();
    let mut hmap = Hmap::new(MockTransport::new(vec![0xB4]), RecordingSink::new());
    let err = must_err(hmap.add_map(MOUSE_MAP));
    assert_eq!(
        err,
        HmapError::Descriptor(DescriptorError::StackUnderflow { offset: 0 })
    );
    assert_eq!(
        err.to_string(),
        "Descriptor error: Pop without matching push at offset 0"
    );
}

#[test]
fn test_oversized_map_is_rejected() {
    static BIG: [MapItem; 1025] = [MapItem::key("KEY_A", keyboard(0x04), KEY_A); 1025];
    let mut hmap = mouse();
    assert!(matches!(hmap.add_map(&BIG), Err(HmapError::Resource(_))));
}

#[test]
fn test_required_row_passes_on_richer_descriptor() -> TestResult {
    static NEEDS_KEY_A: UsageMap = &[MapItem::key("KEY_A", keyboard(0x04), KEY_A).required()];

    let mut poor = mouse();
    assert_eq!(
        poor.add_map(NEEDS_KEY_A).err(),
        Some(HmapError::RequiredRowUnbound { name: "KEY_A" })
    );

    let rich = attached(keyboard_descriptor(), &[NEEDS_KEY_A])?;
    assert!(must_some(rich.caps(0), "caps").is_set(0));
    Ok(())
}

#[test]
fn test_evdev_props_announced() -> TestResult {
    let mut hmap = mouse();
    hmap.set_evdev_prop(INPUT_PROP_BUTTONPAD);
    hmap.set_evdev_prop(0x40);
    hmap.add_map(MOUSE_MAP)?;
    hmap.attach()?;
    assert_eq!(hmap.sink().inner().props, vec![INPUT_PROP_BUTTONPAD]);
    Ok(())
}

#[test]
fn test_device_name_and_debug_level() -> TestResult {
    init_test_tracing();
    let config = HmapConfig::default()
        .with_debug_level(0)
        .with_description("Mouse");
    let mut hmap = Hmap::with_config(
        MockTransport::new(mouse_descriptor()),
        RecordingSink::new(),
        config,
    );
    hmap.set_debug_level(9);
    assert_eq!(hmap.config().debug_level, 2);

    hmap.add_map(MOUSE_MAP)?;
    hmap.attach()?;
    hmap.handle_report(&[1, 1, 1])?;
    assert_eq!(
        hmap.sink().inner().name.as_deref(),
        Some("Mock HID Device Mouse")
    );
    assert_eq!(hmap.sink().inner().events().len(), 3);
    Ok(())
}

static Z_RUNNING: AtomicUsize = AtomicUsize::new(0);
static Z_LAST_VALUE: AtomicUsize = AtomicUsize::new(0);
static DONE_ATTACHING: AtomicUsize = AtomicUsize::new(0);
static DONE_REPORTS: AtomicUsize = AtomicUsize::new(0);
static DONE_DETACHING: AtomicUsize = AtomicUsize::new(0);

fn z_axis_cb(sink: &mut dyn EvdevSink, state: CallbackState<'_>) -> CallbackResult {
    match state {
        CallbackState::Attaching => {
            sink.support_event(EV_ABS);
            sink.support_abs(ABS_Z, hmap::AbsInfo::new(0, 255));
        }
        CallbackState::Running { usage, value, .. } => {
            assert_eq!(usage, generic_desktop::Z);
            Z_RUNNING.fetch_add(1, Ordering::SeqCst);
            Z_LAST_VALUE.store(usize::try_from(value).unwrap_or(0), Ordering::SeqCst);
            sink.push_event(EV_ABS, ABS_Z, value);
        }
        CallbackState::ReportDone | CallbackState::Detaching => {}
    }
    Ok(())
}

fn done_cb(_sink: &mut dyn EvdevSink, state: CallbackState<'_>) -> CallbackResult {
    let counter = match state {
        CallbackState::Attaching => &DONE_ATTACHING,
        CallbackState::ReportDone => &DONE_REPORTS,
        CallbackState::Detaching => &DONE_DETACHING,
        CallbackState::Running { .. } => {
            return Err(CallbackError::Failed("unexpected item".to_string()));
        }
    };
    counter.fetch_add(1, Ordering::SeqCst);
    Ok(())
}

static Z_MAP: UsageMap = &[
    MapItem::abs_cb("Z", generic_desktop::Z, z_axis_cb),
    MapItem::completion("DONE", done_cb),
];

#[test]
fn test_callback_rows_see_every_phase() -> TestResult {
    let descriptor = DescriptorBuilder::new()
        .application(generic_desktop::JOYSTICK)
        .usage_page(page::GENERIC_DESKTOP)
        .usage(generic_desktop::Z.id)
        .logical_min(0)
        .logical_max(255)
        .report_size(8)
        .report_count(1)
        .input(input::DATA_VAR_ABS)
        .end_collection()
        .build();
    let mut hmap = attached(descriptor, &[Z_MAP])?;
    assert_eq!(DONE_ATTACHING.load(Ordering::SeqCst), 1);
    assert_eq!(hmap.sink().inner().abs.len(), 1);

    hmap.handle_report(&[0x80])?;
    hmap.handle_report(&[0x81])?;
    assert_eq!(Z_RUNNING.load(Ordering::SeqCst), 2);
    assert_eq!(Z_LAST_VALUE.load(Ordering::SeqCst), 0x81);
    assert_eq!(DONE_REPORTS.load(Ordering::SeqCst), 2);
    assert_eq!(
        hmap.sink().inner().events(),
        vec![(EV_ABS, ABS_Z, 0x80), (EV_ABS, ABS_Z, 0x81)]
    );

    hmap.detach();
    assert_eq!(DONE_DETACHING.load(Ordering::SeqCst), 1);
    Ok(())
}

static ATTACH_ONLY_CALLS: AtomicUsize = AtomicUsize::new(0);

fn attach_only_cb(_sink: &mut dyn EvdevSink, _state: CallbackState<'_>) -> CallbackResult {
    ATTACH_ONLY_CALLS.fetch_add(1, Ordering::SeqCst);
    Err(CallbackError::AttachOnly)
}

static ATTACH_ONLY_MAP: UsageMap = &[
    MapItem::rel("X", generic_desktop::X, hmap::codes::REL_X),
    MapItem::completion("ONCE", attach_only_cb),
];

#[test]
fn test_attach_only_completion_runs_once() -> TestResult {
    let mut hmap = attached(mouse_descriptor(), &[ATTACH_ONLY_MAP])?;
    hmap.handle_report(&[0, 1, 0])?;
    hmap.handle_report(&[0, 2, 0])?;
    hmap.detach();
    assert_eq!(ATTACH_ONLY_CALLS.load(Ordering::SeqCst), 1);
    Ok(())
}
