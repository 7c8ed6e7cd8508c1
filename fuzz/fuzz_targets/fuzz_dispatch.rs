//! Fuzzes report dispatch with arbitrary input reports against the
//! multi-report fixture.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_dispatch
#![no_main]
use hmap::Hmap;
use hmap_test_helpers::prelude::*;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut hmap = Hmap::new(
        MockTransport::new(multi_report_descriptor()),
        CountingSink::default(),
    );
    if hmap.add_map(KEYBOARD_MAP).is_err() || hmap.add_map(CONSUMER_MAP).is_err() {
        return;
    }
    if hmap.attach().is_err() {
        return;
    }

    // Each chunk is one report; every delivered report ends with one sync.
    let mut delivered = 0usize;
    for report in data.chunks(7) {
        if hmap.handle_report(report).is_err() {
            return;
        }
        if matches!(report.first(), Some(1 | 2)) {
            delivered += 1;
        }
    }
    assert_eq!(hmap.sink().inner().syncs, delivered);
});
