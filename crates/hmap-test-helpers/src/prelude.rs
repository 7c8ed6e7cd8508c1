//! Convenience re-exports for common test utilities.
//!
//! ```rust,ignore
//! use hmap_test_helpers::prelude::*;
//! ```

pub use crate::builder::{DescriptorBuilder, collection, input};
pub use crate::init_test_tracing;
pub use crate::must::{must, must_err, must_some, must_with};

#[cfg(feature = "tracking")]
pub use crate::tracking::{AllocationGuard, TrackingAllocator, track};

#[cfg(feature = "mock")]
pub use crate::mock::{CountingSink, MockTransport, RecordedEvent, RecordingSink};

#[cfg(feature = "fixtures")]
pub use crate::fixtures::{
    CONSUMER_MAP, KEYBOARD_MAP, MOUSE_MAP, attached, keyboard_descriptor, mouse_descriptor,
    multi_report_descriptor, pen_descriptor, pen_descriptor_without_pressure, pen_report,
    system_control_descriptor,
};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
