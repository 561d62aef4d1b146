//! Duplicate-suppression engine (C3): detects packets that are identical,
//! or identical modulo a closed set of normalization transforms, within a
//! short sliding window keyed by source callsign.
//!
//! Grounded on the same "ring of time-bucketed slots" discipline the
//! history database ([`crate::historydb`]) uses for its shard locks, sized
//! down to a single lock since the dedup window is tiny (tens of seconds)
//! compared to the history table's hours-long retention. A fixed-length
//! ring where slot `i` is reused every `window_secs` seconds gives O(1)
//! amortized eviction for free: a slot's old contents are only ever
//! visible for at most one window before the next write to that slot
//! clobbers them.
//!
//! Entries themselves live in a [`crate::cellpool::CellPool`] rather than
//! directly in the ring: a slot stores the indices it owns and frees them
//! back to the pool on rollover, so the arena never grows past the
//! high-water mark of concurrently-live entries regardless of how bursty
//! traffic gets.

mod normalize;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::cellpool::{CellPool, CellPoolStats};
use crate::tick::Tick;

pub use normalize::Variation;

struct DupeEntry {
    src: String,
    body: Vec<u8>,
}

struct RingSlot {
    tick_secs: Option<u64>,
    /// Indices into the engine's `pool`, not the entries themselves — a
    /// slot's old cells are freed back to the pool the moment the slot
    /// rolls over to a new second, same discipline as [`crate::heard`]'s
    /// move-to-front arena.
    entries: Vec<usize>,
}

impl RingSlot {
    fn empty() -> Self {
        RingSlot { tick_secs: None, entries: Vec::new() }
    }
}

/// Outcome of checking one packet against the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupResult {
    pub is_duplicate: bool,
    pub variation: Option<Variation>,
}

struct Inner {
    ring: Vec<RingSlot>,
    window_secs: u64,
}

/// Counters surfaced under the status JSON's `dupecheck` section.
#[derive(Debug, Default)]
pub struct DedupeStats {
    pub dupes_dropped: u64,
    pub uniques_out: u64,
    pub variation_counts: Vec<(&'static str, u64)>,
    pub pool: Option<CellPoolStats>,
}

/// The engine: one instance shared (`Arc`) by every ingest worker.
pub struct DedupeEngine {
    inner: Mutex<Inner>,
    pool: CellPool<DupeEntry>,
    dupes_dropped: AtomicU64,
    uniques_out: AtomicU64,
    variation_counts: [AtomicU64; Variation::ALL.len()],
}

impl DedupeEngine {
    pub fn new(window_secs: u64) -> Self {
        let window_secs = window_secs.max(1);
        let ring = (0..window_secs).map(|_| RingSlot::empty()).collect();
        DedupeEngine {
            inner: Mutex::new(Inner { ring, window_secs }),
            pool: CellPool::new("dupe_entry"),
            dupes_dropped: AtomicU64::new(0),
            uniques_out: AtomicU64::new(0),
            variation_counts: Default::default(),
        }
    }

    /// Check `(src, body)` against the window and, if it's not a
    /// duplicate, record it. `body` should be the raw packet bytes past
    /// the header (the info field), matching the original's dedup key of
    /// source callsign plus packet body.
    pub fn check(&self, src: &str, body: &[u8], now: Tick) -> DedupResult {
        let mut inner = self.inner.lock().expect("dedupe mutex poisoned");
        let window_secs = inner.window_secs;
        let now_secs = now.as_secs();

        for transform in Variation::ALL {
            let canon_new = transform.apply(body);
            for slot in inner.ring.iter() {
                let Some(slot_tick) = slot.tick_secs else { continue };
                if now_secs.saturating_sub(slot_tick) >= window_secs {
                    continue;
                }
                for &idx in &slot.entries {
                    let matched = self
                        .pool
                        .with(idx, |entry| entry.src == src && transform.apply(&entry.body) == canon_new)
                        .unwrap_or(false);
                    if matched {
                        self.dupes_dropped.fetch_add(1, Ordering::Relaxed);
                        self.bump_variation(transform);
                        return DedupResult { is_duplicate: true, variation: Some(transform) };
                    }
                }
            }
        }

        let idx = (now_secs % window_secs) as usize;
        let slot = &mut inner.ring[idx];
        if slot.tick_secs != Some(now_secs) {
            for &old_idx in &slot.entries {
                self.pool.free(old_idx);
            }
            slot.entries.clear();
            slot.tick_secs = Some(now_secs);
        }
        let new_idx = self.pool.alloc(DupeEntry { src: src.to_string(), body: body.to_vec() });
        slot.entries.push(new_idx);
        self.uniques_out.fetch_add(1, Ordering::Relaxed);
        DedupResult { is_duplicate: false, variation: None }
    }

    fn bump_variation(&self, v: Variation) {
        if let Some(idx) = Variation::ALL.iter().position(|&x| x == v) {
            self.variation_counts[idx].fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn stats(&self) -> DedupeStats {
        DedupeStats {
            dupes_dropped: self.dupes_dropped.load(Ordering::Relaxed),
            uniques_out: self.uniques_out.load(Ordering::Relaxed),
            variation_counts: Variation::ALL
                .iter()
                .zip(self.variation_counts.iter())
                .map(|(v, c)| (v.label(), c.load(Ordering::Relaxed)))
                .collect(),
            pool: Some(self.pool.stats()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_bytes_within_window_are_flagged_exact_duplicates() {
        let engine = DedupeEngine::new(30);
        let body = b"!6028.51N/02505.68E-Test";
        let first = engine.check("OH7LZB", body, Tick::from_secs(100));
        assert!(!first.is_duplicate);
        let second = engine.check("OH7LZB", body, Tick::from_secs(100));
        assert!(second.is_duplicate);
        assert_eq!(second.variation, Some(Variation::Exact));
    }

    #[test]
    fn different_source_is_never_a_duplicate() {
        let engine = DedupeEngine::new(30);
        let body = b"!6028.51N/02505.68E-Test";
        engine.check("OH7LZB", body, Tick::from_secs(100));
        let other = engine.check("OH7LZC", body, Tick::from_secs(100));
        assert!(!other.is_duplicate);
    }

    #[test]
    fn whitespace_variant_is_detected_and_counted_separately_from_exact() {
        let engine = DedupeEngine::new(30);
        engine.check("OH7LZB", b"hello world   ", Tick::from_secs(10));
        let result = engine.check("OH7LZB", b"hello world", Tick::from_secs(11));
        assert!(result.is_duplicate);
        assert_eq!(result.variation, Some(Variation::SpaceTrim));
    }

    #[test]
    fn entry_older_than_window_is_not_a_duplicate() {
        let engine = DedupeEngine::new(5);
        let body = b"!6028.51N/02505.68E-Test";
        engine.check("OH7LZB", body, Tick::from_secs(100));
        let later = engine.check("OH7LZB", body, Tick::from_secs(110));
        assert!(!later.is_duplicate);
    }

    #[test]
    fn s6_two_sources_same_packet_half_second_apart_is_a_duplicate() {
        let engine = DedupeEngine::new(30);
        let body = b"!6028.51N/02505.68E-Test";
        engine.check("OH7LZB", body, Tick::from_secs(1000));
        let second = engine.check("OH7LZB", body, Tick::from_secs(1000));
        assert!(second.is_duplicate);
        let stats = engine.stats();
        assert_eq!(stats.dupes_dropped, 1);
        assert_eq!(stats.uniques_out, 1);
    }

    #[test]
    fn pool_cells_used_stays_bounded_as_the_ring_rotates_past_the_window() {
        let engine = DedupeEngine::new(3);
        for secs in 0..30 {
            engine.check("OH7LZB", format!("packet {secs}").as_bytes(), Tick::from_secs(secs));
        }
        let pool_stats = engine.stats().pool.expect("pool stats present");
        // Each of the 3 ring slots holds at most one entry (one distinct
        // body per second here), so the arena never needs more live cells
        // than ring slots regardless of how many seconds have elapsed.
        assert!(pool_stats.cells_used <= 3);
    }
}
