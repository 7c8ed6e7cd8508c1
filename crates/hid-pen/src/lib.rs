//! HID pen and digitizer driver.
//!
//! Handles top-level collections Digitizers/Pen (Microsoft pen, strict map)
//! and Digitizers/Digitizer (generic map). Tip, eraser and barrel switches
//! become `BTN_*` keys; position, pressure and tilt become `ABS_*` axes.
//!
//! ```rust,ignore
//! let mut hmap = hmap::Hmap::new(transport, sink);
//! let kind = hmap_hid_pen::probe_and_attach(&mut hmap)?;
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod driver;
pub mod ids;
pub mod maps;
pub mod quirks;

pub use driver::{PenKind, attach, probe, probe_and_attach};
pub use ids::{WACOM_VENDOR_ID, product_ids};
pub use maps::{DIGITIZER_MAP, PEN_MAP};
pub use quirks::{GRAPHIRE3_INIT_REPORT, apply_init_quirks, needs_graphire3_init};
