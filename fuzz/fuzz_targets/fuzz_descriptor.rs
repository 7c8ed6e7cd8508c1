//! Fuzzes the report descriptor parser and map resolution with arbitrary
//! descriptors.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_descriptor
#![no_main]
use hmap::{Hmap, ReportKind, parse_descriptor};
use hmap_test_helpers::prelude::*;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(parsed) = parse_descriptor(data) {
        for item in &parsed.items {
            assert!(item.location.bit_width <= 32);
            assert!(item.location.count > 0);
        }
        let _ = parsed.input_buffer_size();
        let _ = parsed.max_report_bytes(ReportKind::Feature);
    }

    // Resolution and attach over the same bytes must fail cleanly or succeed.
    let mut hmap = Hmap::new(MockTransport::new(data.to_vec()), CountingSink::default());
    for map in [MOUSE_MAP, KEYBOARD_MAP, CONSUMER_MAP] {
        let _ = hmap.add_map(map);
    }
    let _ = hmap.attach();
});
