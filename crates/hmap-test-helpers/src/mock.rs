//! Mock sinks and transports.

use hmap::codes::type_name;
use hmap::{AbsInfo, DeviceInfo, EvdevSink, HidTransport, InputId, ReportType, SinkError, TransportError};
use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;

/// One call that reached the sink after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedEvent {
    Event { ev_type: u16, code: u16, value: i32 },
    Sync,
}

/// Sink that records every announcement and event.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub name: Option<String>,
    pub id: Option<InputId>,
    pub event_types: Vec<u16>,
    pub keys: Vec<u16>,
    pub rels: Vec<u16>,
    pub abs: Vec<(u16, AbsInfo)>,
    pub props: Vec<u16>,
    pub log: Vec<RecordedEvent>,
    pub registered: bool,
    pub register_calls: usize,
    pub unregister_calls: usize,
    fail_register: Option<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose `register` fails with `reason`.
    pub fn failing_register(reason: impl Into<String>) -> Self {
        Self {
            fail_register: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Events without the sync markers.
    pub fn events(&self) -> Vec<(u16, u16, i32)> {
        self.log
            .iter()
            .filter_map(|entry| match *entry {
                RecordedEvent::Event {
                    ev_type,
                    code,
                    value,
                } => Some((ev_type, code, value)),
                RecordedEvent::Sync => None,
            })
            .collect()
    }

    /// Events grouped per completed `SYN_REPORT` frame.
    pub fn frames(&self) -> Vec<Vec<(u16, u16, i32)>> {
        let mut frames = Vec::new();
        let mut current = Vec::new();
        for entry in &self.log {
            match *entry {
                RecordedEvent::Event {
                    ev_type,
                    code,
                    value,
                } => current.push((ev_type, code, value)),
                RecordedEvent::Sync => frames.push(std::mem::take(&mut current)),
            }
        }
        frames
    }

    pub fn sync_count(&self) -> usize {
        self.log
            .iter()
            .filter(|entry| **entry == RecordedEvent::Sync)
            .count()
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// One line per event, e.g. `EV_KEY 0x110 1`, and `SYN_REPORT`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.log {
            match *entry {
                RecordedEvent::Event {
                    ev_type,
                    code,
                    value,
                } => {
                    let _ = writeln!(out, "{} {:#05x} {}", type_name(ev_type), code, value);
                }
                RecordedEvent::Sync => out.push_str("SYN_REPORT\n"),
            }
        }
        out
    }

    /// Announcements in a stable textual form.
    pub fn render_capabilities(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "name: {}", self.name.as_deref().unwrap_or("-"));
        let types: Vec<&str> = self.event_types.iter().map(|t| type_name(*t)).collect();
        let _ = writeln!(out, "events: {}", types.join(" "));
        let _ = writeln!(out, "keys: {:x?}", self.keys);
        let _ = writeln!(out, "rels: {:x?}", self.rels);
        for (code, info) in &self.abs {
            let _ = writeln!(out, "abs {:#04x}: [{}, {}]", code, info.minimum, info.maximum);
        }
        let _ = write!(out, "props: {:x?}", self.props);
        out
    }
}

impl EvdevSink for RecordingSink {
    fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    fn set_id(&mut self, id: InputId) {
        self.id = Some(id);
    }

    fn support_event(&mut self, ev_type: u16) {
        self.event_types.push(ev_type);
    }

    fn support_key(&mut self, code: u16) {
        self.keys.push(code);
    }

    fn support_rel(&mut self, code: u16) {
        self.rels.push(code);
    }

    fn support_abs(&mut self, code: u16, info: AbsInfo) {
        self.abs.push((code, info));
    }

    fn support_prop(&mut self, prop: u16) {
        self.props.push(prop);
    }

    fn push_event(&mut self, ev_type: u16, code: u16, value: i32) {
        self.log.push(RecordedEvent::Event {
            ev_type,
            code,
            value,
        });
    }

    fn sync(&mut self) {
        self.log.push(RecordedEvent::Sync);
    }

    fn register(&mut self) -> Result<(), SinkError> {
        self.register_calls += 1;
        if let Some(reason) = &self.fail_register {
            return Err(SinkError::RegistrationFailed(reason.clone()));
        }
        self.registered = true;
        Ok(())
    }

    fn unregister(&mut self) {
        self.unregister_calls += 1;
        self.registered = false;
    }
}

/// Sink that only counts; never allocates after construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountingSink {
    pub events: usize,
    pub syncs: usize,
    pub key_downs: usize,
    pub key_ups: usize,
}

impl EvdevSink for CountingSink {
    fn set_name(&mut self, _name: &str) {}
    fn set_id(&mut self, _id: InputId) {}
    fn support_event(&mut self, _ev_type: u16) {}
    fn support_key(&mut self, _code: u16) {}
    fn support_rel(&mut self, _code: u16) {}
    fn support_abs(&mut self, _code: u16, _info: AbsInfo) {}
    fn support_prop(&mut self, _prop: u16) {}

    fn push_event(&mut self, ev_type: u16, _code: u16, value: i32) {
        self.events += 1;
        if ev_type == hmap::codes::EV_KEY {
            if value == 0 {
                self.key_ups += 1;
            } else {
                self.key_downs += 1;
            }
        }
    }

    fn sync(&mut self) {
        self.syncs += 1;
    }

    fn register(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn unregister(&mut self) {}
}

/// In-memory HID transport.
#[derive(Debug, Clone)]
pub struct MockTransport {
    info: DeviceInfo,
    descriptor: Vec<u8>,
    feature_reports: HashMap<u8, Vec<u8>>,
    pending: VecDeque<Result<Vec<u8>, TransportError>>,
    /// Every `set_report` call: type, ID and data.
    pub set_reports: Vec<(ReportType, u8, Vec<u8>)>,
    /// Input size passed to the last successful `start`.
    pub started: Option<usize>,
    pub start_calls: usize,
    pub stop_calls: usize,
    pub descriptor_reads: usize,
    fail_descriptor: Option<TransportError>,
    fail_set_report: Option<TransportError>,
    fail_start: Option<TransportError>,
}

impl MockTransport {
    pub fn new(descriptor: impl Into<Vec<u8>>) -> Self {
        Self {
            info: DeviceInfo::new(0x1234, 0x5678)
                .with_name("Mock HID Device")
                .with_bus(hmap::transport::BUS_USB),
            descriptor: descriptor.into(),
            feature_reports: HashMap::new(),
            pending: VecDeque::new(),
            set_reports: Vec::new(),
            started: None,
            start_calls: 0,
            stop_calls: 0,
            descriptor_reads: 0,
            fail_descriptor: None,
            fail_set_report: None,
            fail_start: None,
        }
    }

    pub fn with_info(mut self, info: DeviceInfo) -> Self {
        self.info = info;
        self
    }

    pub fn with_failing_descriptor(mut self, error: TransportError) -> Self {
        self.fail_descriptor = Some(error);
        self
    }

    pub fn with_failing_set_report(mut self, error: TransportError) -> Self {
        self.fail_set_report = Some(error);
        self
    }

    pub fn with_failing_start(mut self, error: TransportError) -> Self {
        self.fail_start = Some(error);
        self
    }

    pub fn with_feature_report(mut self, report_id: u8, data: impl Into<Vec<u8>>) -> Self {
        self.feature_reports.insert(report_id, data.into());
        self
    }

    /// Queue a raw input report for `read_input`.
    pub fn queue_input(&mut self, report: impl Into<Vec<u8>>) {
        self.pending.push_back(Ok(report.into()));
    }

    /// Queue a read failure for `read_input`.
    pub fn queue_error(&mut self, error: TransportError) {
        self.pending.push_back(Err(error));
    }

    pub fn pending_inputs(&self) -> usize {
        self.pending.len()
    }

    pub fn is_started(&self) -> bool {
        self.started.is_some()
    }
}

impl HidTransport for MockTransport {
    fn report_descriptor(&mut self) -> Result<Vec<u8>, TransportError> {
        self.descriptor_reads += 1;
        match &self.fail_descriptor {
            Some(error) => Err(error.clone()),
            None => Ok(self.descriptor.clone()),
        }
    }

    fn device_info(&self) -> &DeviceInfo {
        &self.info
    }

    fn set_report(
        &mut self,
        data: &[u8],
        report_type: ReportType,
        report_id: u8,
    ) -> Result<(), TransportError> {
        if let Some(error) = &self.fail_set_report {
            return Err(error.clone());
        }
        self.set_reports.push((report_type, report_id, data.to_vec()));
        if report_type == ReportType::Feature {
            self.feature_reports.insert(report_id, data.to_vec());
        }
        Ok(())
    }

    fn get_report(
        &mut self,
        buf: &mut [u8],
        report_type: ReportType,
        report_id: u8,
    ) -> Result<usize, TransportError> {
        if report_type != ReportType::Feature {
            return Err(TransportError::InvalidReport(format!(
                "no {report_type:?} report {report_id}"
            )));
        }
        let data = self.feature_reports.get(&report_id).ok_or_else(|| {
            TransportError::InvalidReport(format!("no feature report {report_id}"))
        })?;
        let actual = buf.len();
        let dest = buf
            .get_mut(..data.len())
            .ok_or(TransportError::BufferTooSmall {
                needed: data.len(),
                actual,
            })?;
        dest.copy_from_slice(data);
        Ok(data.len())
    }

    fn start(&mut self, input_size: usize) -> Result<(), TransportError> {
        self.start_calls += 1;
        if let Some(error) = &self.fail_start {
            return Err(error.clone());
        }
        self.started = Some(input_size);
        Ok(())
    }

    fn stop(&mut self) {
        self.stop_calls += 1;
        self.started = None;
    }

    fn read_input(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.pending.pop_front() {
            None => Ok(0),
            Some(Err(error)) => Err(error),
            Some(Ok(report)) => {
                let actual = buf.len();
                let dest = buf
                    .get_mut(..report.len())
                    .ok_or(TransportError::BufferTooSmall {
                        needed: report.len(),
                        actual,
                    })?;
                dest.copy_from_slice(&report);
                Ok(report.len())
            }
        }
    }
}
