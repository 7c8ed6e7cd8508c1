//! HID-to-input-event translation engine.
//!
//! This crate drives a HID transport, parses its report descriptor and turns
//! input reports into evdev-style events, using declarative usage maps
//! supplied by child drivers.
//!
//! ## Pipeline
//! - [`descriptor`]: HID 1.11 item stream to located input items
//! - [`resolve`]: usage maps bound to items, producing the dispatch plan
//! - [`dispatch`]: per-report extraction and event emission
//! - [`device`]: attach/detach lifecycle around a transport and a sink
//!
//! ## Example
//!
//! ```rust,ignore
//! use hmap::{Hmap, MapItem, UsageMap};
//! use hmap::codes::{BTN_LEFT, REL_X, REL_Y};
//! use hmap::usage::{button, generic_desktop};
//!
//! static MOUSE: UsageMap = &[
//!     MapItem::key("BTN_LEFT", button(1), BTN_LEFT),
//!     MapItem::rel("X", generic_desktop::X, REL_X).required(),
//!     MapItem::rel("Y", generic_desktop::Y, REL_Y).required(),
//! ];
//!
//! let mut hmap = Hmap::new(transport, sink);
//! hmap.add_map(MOUSE)?;
//! hmap.attach()?;
//! hmap.handle_report(&[0x01, 0x05, 0xFB])?;
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod caps;
pub mod codes;
pub mod config;
pub mod descriptor;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod location;
pub mod map;
pub mod resolve;
pub mod sink;
pub mod transport;
pub mod usage;

pub use caps::{Caps, EvdevProps};
pub use config::HmapConfig;
pub use descriptor::{
    HidParser, ItemKind, MainFlags, ParsedDescriptor, ParsedItem, ReportKind, parse_descriptor,
};
pub use device::Hmap;
pub use error::{
    CallbackError, CallbackResult, DescriptorError, HmapError, HmapResult, SinkError,
    TransportError,
};
pub use location::Location;
pub use map::{CallbackState, MapCallback, MapItem, Payload, RelAbs, UsageMap};
pub use resolve::{DispatchRecord, Plan};
pub use sink::{AbsInfo, EvdevSink, InputId, SinkAdapter};
pub use transport::{DeviceInfo, HidTransport, ReportType};
pub use usage::Usage;
