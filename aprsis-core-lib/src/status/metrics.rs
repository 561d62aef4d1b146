//! Prometheus/OpenTelemetry metrics wiring for C10's `/metrics` endpoint,
//! grounded in the teacher's `telemetry::metrics` module: an
//! `opentelemetry_prometheus` exporter feeding a `prometheus::Registry`,
//! read back out through `opentelemetry::global::meter`.
//!
//! Unlike the teacher's metrics — incremented at each call site with
//! `Counter::add`/`Histogram::record` — every number this core reports is
//! already tracked by a plain atomic somewhere else (`RxErrCounters`,
//! `DedupeEngine`, `ClientRegistry`, ...). Observable instruments with a
//! callback that reads those atomics at scrape time avoid a second,
//! redundant set of counters drifting out of sync with the status JSON.

use opentelemetry::metrics::{ObservableCounter, ObservableGauge};
use opentelemetry::{global, KeyValue};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;

use crate::net::Shared;

/// Holds the registered observable instrument handles. Nothing reads these
/// fields directly; they exist only so the instruments (and their
/// callbacks) stay registered for the process's lifetime — dropping an
/// observable instrument unregisters its callback.
pub struct Metrics {
    _clients_connected: ObservableGauge<u64>,
    _historydb_entries: ObservableGauge<u64>,
    _dedupe_pool_cells_used: ObservableGauge<u64>,
    _dupes_dropped_total: ObservableCounter<u64>,
    _uniques_out_total: ObservableCounter<u64>,
    _connects_total: ObservableCounter<u64>,
    _rx_errs_total: ObservableCounter<u64>,
}

/// Wire a `prometheus::Registry` to the global `opentelemetry` meter
/// provider and register every observable instrument against `shared`.
/// Returns the registry the `/metrics` handler encodes from.
pub fn init(shared: Shared) -> Result<(Metrics, Registry), Box<dyn std::error::Error + Send + Sync>> {
    let registry = Registry::new();
    let exporter = opentelemetry_prometheus::exporter().with_registry(registry.clone()).build()?;
    let provider = SdkMeterProvider::builder().with_reader(exporter).build();
    global::set_meter_provider(provider);
    let meter = global::meter("aprsis-core");

    let clients_shared = shared.clone();
    let clients_connected = meter
        .u64_observable_gauge("aprsis_clients_connected")
        .with_description("Currently connected APRS-IS clients")
        .with_callback(move |observer| {
            observer.observe(clients_shared.registry.len() as u64, &[]);
        })
        .build();

    let history_shared = shared.clone();
    let historydb_entries = meter
        .u64_observable_gauge("aprsis_historydb_entries")
        .with_description("Live entries in the position history table")
        .with_callback(move |observer| {
            observer.observe(history_shared.history.len() as u64, &[]);
        })
        .build();

    let pool_shared = shared.clone();
    let dedupe_pool_cells_used = meter
        .u64_observable_gauge("aprsis_dedupe_pool_cells_used")
        .with_description("Cells currently allocated from the dedupe entry pool")
        .with_callback(move |observer| {
            if let Some(pool) = pool_shared.dedupe.stats().pool {
                observer.observe(pool.cells_used as u64, &[]);
            }
        })
        .build();

    let dupes_shared = shared.clone();
    let dupes_dropped_total = meter
        .u64_observable_counter("aprsis_dupes_dropped_total")
        .with_description("Packets dropped as duplicates since process start")
        .with_callback(move |observer| {
            observer.observe(dupes_shared.dedupe.stats().dupes_dropped, &[]);
        })
        .build();

    let uniques_shared = shared.clone();
    let uniques_out_total = meter
        .u64_observable_counter("aprsis_uniques_out_total")
        .with_description("Unique packets passed through the dedupe window since process start")
        .with_callback(move |observer| {
            observer.observe(uniques_shared.dedupe.stats().uniques_out, &[]);
        })
        .build();

    let connects_shared = shared.clone();
    let connects_total = meter
        .u64_observable_counter("aprsis_connects_total")
        .with_description("Client connections accepted since process start")
        .with_callback(move |observer| {
            observer.observe(connects_shared.registry.connects_total(), &[]);
        })
        .build();

    let rxerr_shared = shared;
    let rx_errs_total = meter
        .u64_observable_counter("aprsis_rx_errs_total")
        .with_description("Parse errors by kind since process start")
        .with_callback(move |observer| {
            for (label, count) in rxerr_shared.rxerr.snapshot() {
                observer.observe(count, &[KeyValue::new("kind", label)]);
            }
        })
        .build();

    Ok((
        Metrics {
            _clients_connected: clients_connected,
            _historydb_entries: historydb_entries,
            _dedupe_pool_cells_used: dedupe_pool_cells_used,
            _dupes_dropped_total: dupes_dropped_total,
            _uniques_out_total: uniques_out_total,
            _connects_total: connects_total,
            _rx_errs_total: rx_errs_total,
        },
        registry,
    ))
}
