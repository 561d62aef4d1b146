//! Micro benchmarks for the TNC2 frame parser (component C2).
//! Pure CPU — no network, no IO.
//!
//! ```bash
//! cargo bench --bench bench_parser
//! ```
//!
//! Frames below cover the shapes the parser spends the most time on:
//! a bare status/telemetry body (no position), an uncompressed lat/lon
//! position, a Mic-E binary-destination position, and a third-party
//! (`}`-prefixed) wrapped packet one level deep.

use aprsis_core_lib::tick::Clock;
use criterion::{criterion_group, criterion_main, Criterion};

const MAX_LEN: usize = 512;

const PLAIN_STATUS: &[u8] = b"N0CALL-9>APRS,WIDE1-1,WIDE2-1:>off to the store";

const UNCOMPRESSED_POSITION: &[u8] =
    b"N0CALL-9>APRS,WIDE1-1,WIDE2-1:!4903.50N/07201.75W-Test position";

const MICE_POSITION: &[u8] =
    b"N0CALL-9>T2SP0W,WIDE1-1,WIDE2-1:`c1>l\x1c>/]\"4q}Mic-E test";

const THIRD_PARTY: &[u8] =
    b"SERVER>APRS,TCPIP*:}N0CALL-9>APRS,WIDE2-1:!4903.50N/07201.75W-Test position";

fn bench_plain_status(c: &mut Criterion) {
    let clock = Clock::new();
    c.bench_function("parse_plain_status", |b| {
        b.iter(|| aprsis_core_lib::parse(std::hint::black_box(PLAIN_STATUS), MAX_LEN, &clock));
    });
}

fn bench_uncompressed_position(c: &mut Criterion) {
    let clock = Clock::new();
    c.bench_function("parse_uncompressed_position", |b| {
        b.iter(|| {
            aprsis_core_lib::parse(std::hint::black_box(UNCOMPRESSED_POSITION), MAX_LEN, &clock)
        });
    });
}

fn bench_mice_position(c: &mut Criterion) {
    let clock = Clock::new();
    c.bench_function("parse_mice_position", |b| {
        b.iter(|| aprsis_core_lib::parse(std::hint::black_box(MICE_POSITION), MAX_LEN, &clock));
    });
}

fn bench_third_party(c: &mut Criterion) {
    let clock = Clock::new();
    c.bench_function("parse_third_party_wrapped", |b| {
        b.iter(|| aprsis_core_lib::parse(std::hint::black_box(THIRD_PARTY), MAX_LEN, &clock));
    });
}

criterion_group!(
    parser_benches,
    bench_plain_status,
    bench_uncompressed_position,
    bench_mice_position,
    bench_third_party,
);
criterion_main!(parser_benches);
