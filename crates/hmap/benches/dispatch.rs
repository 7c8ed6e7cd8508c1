use criterion::{Criterion, criterion_group, criterion_main};
use hmap::codes::{ABS_PRESSURE, ABS_X, ABS_Y, BTN_TOOL_PEN, BTN_TOUCH};
use hmap::usage::{digitizers, generic_desktop};
use hmap::{Hmap, MapItem, UsageMap, parse_descriptor};
use hmap_test_helpers::prelude::*;

static PEN_AXES_MAP: UsageMap = &[
    MapItem::abs("X", generic_desktop::X, ABS_X),
    MapItem::abs("Y", generic_desktop::Y, ABS_Y),
    MapItem::abs("TIP_PRESSURE", digitizers::TIP_PRESSURE, ABS_PRESSURE),
    MapItem::key("TIP_SWITCH", digitizers::TIP_SWITCH, BTN_TOUCH),
    MapItem::key("IN_RANGE", digitizers::IN_RANGE, BTN_TOOL_PEN),
];

fn counting(
    descriptor: Vec<u8>,
    maps: &[UsageMap],
) -> Option<Hmap<MockTransport, CountingSink>> {
    let mut hmap = Hmap::new(MockTransport::new(descriptor), CountingSink::default());
    for map in maps {
        hmap.add_map(*map).ok()?;
    }
    hmap.attach().ok()?;
    Some(hmap)
}

fn benchmark_parse(c: &mut Criterion) {
    let mouse = mouse_descriptor();
    let multi = multi_report_descriptor();
    let pen = pen_descriptor();

    c.bench_function("parse_descriptor mouse", |b| {
        b.iter(|| std::hint::black_box(parse_descriptor(std::hint::black_box(&mouse)).ok()));
    });

    c.bench_function("parse_descriptor multi_report", |b| {
        b.iter(|| std::hint::black_box(parse_descriptor(std::hint::black_box(&multi)).ok()));
    });

    c.bench_function("parse_descriptor pen", |b| {
        b.iter(|| std::hint::black_box(parse_descriptor(std::hint::black_box(&pen)).ok()));
    });
}

fn benchmark_dispatch(c: &mut Criterion) {
    if let Some(mut hmap) = counting(mouse_descriptor(), &[MOUSE_MAP]) {
        let reports: [&[u8]; 2] = [&[0x01, 0x05, 0xFB], &[0x00, 0x00, 0x00]];
        c.bench_function("handle_report mouse", |b| {
            b.iter(|| {
                for report in &reports {
                    std::hint::black_box(hmap.handle_report(std::hint::black_box(report)).ok());
                }
            });
        });
    }

    if let Some(mut hmap) = counting(keyboard_descriptor(), &[KEYBOARD_MAP]) {
        let reports: [&[u8]; 2] = [&[0x04, 0x05, 0x06, 0, 0, 0], &[0x07, 0, 0, 0, 0, 0]];
        c.bench_function("handle_report keyboard_array", |b| {
            b.iter(|| {
                for report in &reports {
                    std::hint::black_box(hmap.handle_report(std::hint::black_box(report)).ok());
                }
            });
        });
    }

    if let Some(mut hmap) = counting(pen_descriptor(), &[PEN_AXES_MAP]) {
        let reports = [pen_report(1000, 2000, 300, 0x03), pen_report(1010, 1990, 0, 0)];
        c.bench_function("handle_report pen", |b| {
            b.iter(|| {
                for report in &reports {
                    std::hint::black_box(hmap.handle_report(std::hint::black_box(report)).ok());
                }
            });
        });
    }
}

criterion_group!(benches, benchmark_parse, benchmark_dispatch);
criterion_main!(benches);
