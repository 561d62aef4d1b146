//! Micro benchmarks for the history database (component C4): insert and
//! lookup throughput under the 32-shard striping scheme.
//!
//! ```bash
//! cargo bench --bench bench_historydb
//! ```

use std::time::Duration;

use aprsis_core_lib::historydb::HistoryDb;
use aprsis_core_lib::tick::Clock;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

const MAX_LEN: usize = 512;
const STORETIME: Duration = Duration::from_secs(1800);

fn position_frame(n: u32) -> Vec<u8> {
    format!("N{n}CALL>APRS,WIDE1-1,WIDE2-1:!4903.50N/07201.75W-bench station {n}").into_bytes()
}

fn bench_insert_distinct_keys(c: &mut Criterion) {
    let clock = Clock::new();
    let frames: Vec<Vec<u8>> = (0..10_000).map(position_frame).collect();

    let mut group = c.benchmark_group("historydb_insert");
    for &count in &[100usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("distinct_keys", count), &count, |b, &count| {
            b.iter(|| {
                let db = HistoryDb::new();
                for frame in &frames[..count] {
                    let packet = aprsis_core_lib::parse(frame, MAX_LEN, &clock).expect("valid fixture frame");
                    db.insert(&packet);
                }
                std::hint::black_box(&db);
            });
        });
    }
    group.finish();
}

fn bench_insert_same_key_updates(c: &mut Criterion) {
    let clock = Clock::new();
    let frame = position_frame(0);
    let db = HistoryDb::new();

    c.bench_function("historydb_insert_repeated_updates", |b| {
        b.iter(|| {
            let packet = aprsis_core_lib::parse(&frame, MAX_LEN, &clock).expect("valid fixture frame");
            db.insert(std::hint::black_box(&packet));
        });
    });
}

fn bench_lookup(c: &mut Criterion) {
    let clock = Clock::new();
    let db = HistoryDb::new();
    for n in 0..10_000 {
        let frame = position_frame(n);
        let packet = aprsis_core_lib::parse(&frame, MAX_LEN, &clock).expect("valid fixture frame");
        db.insert(&packet);
    }

    c.bench_function("historydb_lookup_hit", |b| {
        b.iter(|| db.lookup(std::hint::black_box("N5000CALL"), clock.tick(), STORETIME));
    });

    c.bench_function("historydb_lookup_miss", |b| {
        b.iter(|| db.lookup(std::hint::black_box("NOSUCHCALL"), clock.tick(), STORETIME));
    });
}

criterion_group!(
    historydb_benches,
    bench_insert_distinct_keys,
    bench_insert_same_key_updates,
    bench_lookup,
);
criterion_main!(historydb_benches);
