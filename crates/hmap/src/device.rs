//! Attach/detach controller.

use crate::caps::{Caps, EvdevProps};
use crate::codes::INPUT_PROP_CNT;
use crate::config::{HmapConfig, MAX_DEBUG_LEVEL};
use crate::descriptor::{ParsedDescriptor, parse_descriptor};
use crate::dispatch::dispatch_report;
use crate::error::{CallbackError, HmapError, HmapResult};
use crate::map::{CallbackState, UsageMap};
use crate::resolve::{DispatchRecord, Plan, resolve, resolve_map};
use crate::sink::{EvdevSink, SinkAdapter};
use crate::transport::HidTransport;
use bit_vec::BitVec;
use tracing::{debug, info, warn};

/// Largest input report buffer the engine allocates.
pub const MAX_INPUT_REPORT_BYTES: usize = 64 * 1024;

/// State that exists only while attached.
#[derive(Debug)]
struct Attached {
    plan: Plan,
    input_buf: Vec<u8>,
    input_ids: BitVec,
    uses_report_ids: bool,
}

/// A HID device translated to evdev events through usage maps.
///
/// Child drivers register one or more maps with [`add_map`](Self::add_map)
/// at probe time, then call [`attach`](Self::attach). Reports arrive through
/// [`handle_report`](Self::handle_report) or [`poll`](Self::poll).
pub struct Hmap<T: HidTransport, S: EvdevSink> {
    transport: T,
    sink: SinkAdapter<S>,
    maps: Vec<UsageMap>,
    caps: Vec<Caps>,
    descriptor: Option<ParsedDescriptor>,
    props: EvdevProps,
    config: HmapConfig,
    attached: Option<Attached>,
}

impl<T: HidTransport, S: EvdevSink> std::fmt::Debug for Hmap<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hmap")
            .field("device", &self.transport.device_info().name)
            .field("maps", &self.maps.len())
            .field("config", &self.config)
            .field("attached", &self.attached.is_some())
            .finish()
    }
}

impl<T: HidTransport, S: EvdevSink> Hmap<T, S> {
    pub fn new(transport: T, sink: S) -> Self {
        Self::with_config(transport, sink, HmapConfig::default())
    }

    pub fn with_config(transport: T, sink: S, config: HmapConfig) -> Self {
        Self {
            transport,
            sink: SinkAdapter::new(sink),
            maps: Vec::new(),
            caps: Vec::new(),
            descriptor: None,
            props: EvdevProps::default(),
            config,
            attached: None,
        }
    }

    pub fn config(&self) -> &HmapConfig {
        &self.config
    }

    pub fn set_debug_level(&mut self, level: u8) {
        self.config.debug_level = level.min(MAX_DEBUG_LEVEL);
    }

    /// Description appended to the device name at attach.
    pub fn set_desc(&mut self, desc: impl Into<String>) {
        self.config.description = Some(desc.into());
    }

    /// Request an evdev input property, announced at attach.
    pub fn set_evdev_prop(&mut self, prop: u16) {
        if !self.props.set(prop) {
            warn!(
                "Ignoring input property {:#x} (limit {:#x})",
                prop, INPUT_PROP_CNT
            );
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn sink(&self) -> &SinkAdapter<S> {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut SinkAdapter<S> {
        &mut self.sink
    }

    /// Capability bitstring of the map registered at `index`.
    pub fn caps(&self, index: usize) -> Option<&Caps> {
        self.caps.get(index)
    }

    pub fn map_count(&self) -> usize {
        self.maps.len()
    }

    /// Dispatch plan of the attached device.
    pub fn plan(&self) -> Option<&Plan> {
        self.attached.as_ref().map(|a| &a.plan)
    }

    /// Parsed report descriptor, fetched from the transport on first use.
    ///
    /// # Errors
    ///
    /// Returns a transport or descriptor error.
    pub fn descriptor(&mut self) -> HmapResult<&ParsedDescriptor> {
        let parsed = match self.descriptor.take() {
            Some(parsed) => parsed,
            None => {
                let raw = self.transport.report_descriptor()?;
                let parsed = parse_descriptor(&raw)?;
                debug!(
                    "Parsed report descriptor: {} bytes, {} input items",
                    raw.len(),
                    parsed.items.len()
                );
                parsed
            }
        };
        Ok(self.descriptor.insert(parsed))
    }

    /// Register a usage map and return the rows it binds.
    ///
    /// # Errors
    ///
    /// Fails when the descriptor cannot be read or parsed, when a required
    /// row binds nothing, or when the device is already attached.
    pub fn add_map(&mut self, map: UsageMap) -> HmapResult<Caps> {
        if self.attached.is_some() {
            return Err(HmapError::AlreadyAttached);
        }
        let index = self.maps.len();
        let resolved = resolve_map(index, map, &self.descriptor()?.items)?;
        debug!(
            "Registered map {} ({} of {} rows bound)",
            index,
            resolved.caps.count(),
            map.len()
        );
        self.maps.push(map);
        self.caps.push(resolved.caps.clone());
        Ok(resolved.caps)
    }

    /// Build the plan, announce capabilities, register the sink and start
    /// the transport.
    ///
    /// # Errors
    ///
    /// Nothing stays attached when this fails.
    pub fn attach(&mut self) -> HmapResult<()> {
        if self.attached.is_some() {
            return Err(HmapError::AlreadyAttached);
        }
        if self.maps.is_empty() {
            return Err(HmapError::NoMaps);
        }

        let descriptor = self.descriptor()?.clone();

        let info = self.transport.device_info();
        let name = self.config.device_name(&info.name);
        let id = info.input_id();
        self.sink.set_name(&name);
        self.sink.set_id(id);

        let resolution = resolve(&self.maps, &descriptor.items)?;

        let input_size = descriptor.input_buffer_size();
        if input_size > MAX_INPUT_REPORT_BYTES {
            return Err(HmapError::Resource(format!(
                "input report of {input_size} bytes exceeds {MAX_INPUT_REPORT_BYTES}"
            )));
        }

        for prop in self.props.iter() {
            self.sink.support_prop(prop);
        }
        resolution.announcements.apply(&mut self.sink);

        let mut plan = resolution.plan;
        self.caps = resolution.caps;
        self.run_attaching(&mut plan);

        if let Err(e) = self.sink.register() {
            warn!("Failed to register evdev sink for {}: {}", name, e);
            self.run_detaching(&plan);
            self.sink.unregister();
            return Err(e.into());
        }

        if let Err(e) = self.transport.start(input_size) {
            warn!("Failed to start transport for {}: {}", name, e);
            self.run_detaching(&plan);
            self.sink.unregister();
            return Err(e.into());
        }

        let mut input_ids = BitVec::from_elem(256, false);
        for id in descriptor.input_report_ids() {
            input_ids.set(usize::from(id), true);
        }

        info!(
            "Attached {}: {} dispatch records, {} completion callbacks, input size {}",
            name,
            plan.records.len(),
            plan.completions.len(),
            input_size
        );

        self.attached = Some(Attached {
            plan,
            input_buf: vec![0; input_size],
            input_ids,
            uses_report_ids: descriptor.uses_report_ids(),
        });
        Ok(())
    }

    /// Invoke item and completion callbacks with `Attaching`.
    fn run_attaching(&mut self, plan: &mut Plan) {
        for record in plan.records.iter_mut() {
            if let DispatchRecord::Callback {
                row,
                callback,
                attach_only,
                ..
            } = record
            {
                match (*callback)(&mut self.sink, CallbackState::Attaching) {
                    Ok(()) => {}
                    Err(CallbackError::AttachOnly) => *attach_only = true,
                    Err(e) => warn!("Map callback {} failed at attach: {}", row.name, e),
                }
            }
        }
        for completion in plan.completions.iter_mut() {
            match (completion.callback)(&mut self.sink, CallbackState::Attaching) {
                Ok(()) => {}
                Err(CallbackError::AttachOnly) => completion.attach_only = true,
                Err(e) => warn!(
                    "Completion callback {} failed at attach: {}",
                    completion.row.name, e
                ),
            }
        }
    }

    fn run_detaching(&mut self, plan: &Plan) {
        for completion in plan.completions.iter().filter(|c| !c.attach_only) {
            if let Err(e) = (completion.callback)(&mut self.sink, CallbackState::Detaching) {
                warn!(
                    "Completion callback {} failed at detach: {}",
                    completion.row.name, e
                );
            }
        }
    }

    /// Stop the transport and release the sink. Detaching a detached
    /// device does nothing.
    pub fn detach(&mut self) {
        let Some(attached) = self.attached.take() else {
            debug!("Detach on a device that is not attached");
            return;
        };
        self.transport.stop();
        self.run_detaching(&attached.plan);
        self.sink.unregister();
        info!("Detached {}", self.transport.device_info().name);
    }

    /// Dispatch one raw input report as delivered by the transport.
    ///
    /// When the descriptor uses report IDs the first byte is the ID.
    /// Empty reports and unknown IDs are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`HmapError::NotAttached`] before attach.
    pub fn handle_report(&mut self, report: &[u8]) -> HmapResult<()> {
        let attached = self.attached.as_mut().ok_or(HmapError::NotAttached)?;
        process_report(
            &mut attached.plan,
            &mut self.sink,
            &attached.input_ids,
            attached.uses_report_ids,
            report,
            self.config.debug_level,
        );
        Ok(())
    }

    /// Read and dispatch one pending report. Returns `true` when a report
    /// was read. Transport errors are logged and the report is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`HmapError::NotAttached`] before attach.
    pub fn poll(&mut self) -> HmapResult<bool> {
        let attached = self.attached.as_mut().ok_or(HmapError::NotAttached)?;
        let Attached {
            plan,
            input_buf,
            input_ids,
            uses_report_ids,
        } = attached;

        let len = match self.transport.read_input(input_buf) {
            Ok(0) => return Ok(false),
            Ok(len) => len.min(input_buf.len()),
            Err(e) => {
                warn!("Dropping input report: {}", e);
                return Ok(false);
            }
        };

        let report = input_buf.get(..len).unwrap_or_default();
        process_report(
            plan,
            &mut self.sink,
            input_ids,
            *uses_report_ids,
            report,
            self.config.debug_level,
        );
        Ok(true)
    }
}

fn process_report<S: EvdevSink>(
    plan: &mut Plan,
    sink: &mut SinkAdapter<S>,
    input_ids: &BitVec,
    uses_report_ids: bool,
    report: &[u8],
    debug_level: u8,
) {
    let (report_id, payload) = if uses_report_ids {
        match report.split_first() {
            Some((&id, payload)) => (id, payload),
            None => {
                warn!("Dropping empty input report");
                return;
            }
        }
    } else if report.is_empty() {
        warn!("Dropping empty input report");
        return;
    } else {
        (0, report)
    };

    if !input_ids.get(usize::from(report_id)).unwrap_or(false) {
        warn!("Dropping input report with unknown ID {}", report_id);
        return;
    }

    dispatch_report(plan, sink, report_id, payload, debug_level);
}

impl<T: HidTransport, S: EvdevSink> Drop for Hmap<T, S> {
    fn drop(&mut self) {
        self.detach();
    }
}
