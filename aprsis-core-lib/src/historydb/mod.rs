//! History database (C4): a callsign-keyed cache of last-known position,
//! used by the filter engine's range/area terms and by late-arrival
//! courtesy forwarding.
//!
//! The conceptual 8192-bucket table is split into 32 independently-locked
//! shards of 256 buckets each, so
//! unrelated keys never contend on the same `RwLock`. Each shard's buckets
//! are singly linked chains realized as `Vec<HistoryEntry>` — no pointer
//! chasing is needed in safe Rust, and a `Vec` is friendlier to the
//! allocator than a real linked list for chains this short.

mod dump;

use std::sync::RwLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::parser::{ParsedPacket, TypeFlags};
use crate::parser::objitem;
use crate::tick::Tick;

pub use dump::{dump_to_writer, load_from_reader, DumpError};

const TOTAL_BUCKETS: u64 = 8192;
const SHARD_COUNT: usize = 32;
const BUCKETS_PER_SHARD: u64 = TOTAL_BUCKETS / SHARD_COUNT as u64;

/// Five-minute grace subtracted from `lastposition_storetime` for the
/// `lookup` validity window: an entry can outlive its "fresh
/// enough to trust" window by up to this much before `cleanup` reaps it.
const LOOKUP_GRACE: Duration = Duration::from_secs(300);

/// A single callsign's last-known position, mirrored into the live-upgrade
/// dump and the status JSON's `historydb` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub key: String,
    pub arrival_secs: u64,
    pub flags: u16,
    pub lat: f64,
    pub lng: f64,
    pub cos_lat: f64,
}

impl HistoryEntry {
    fn arrival(&self) -> Tick {
        Tick::from_secs(self.arrival_secs)
    }
}

/// Outcome of [`HistoryDb::insert`], surfaced as counters on the status
/// JSON's `historydb` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Updated,
    Killed,
    Skipped,
}

struct Shard {
    buckets: Vec<Vec<HistoryEntry>>,
}

/// The table: one instance, constructed at startup and shared by `Arc`
/// across every worker — constructed once in `main` and shared, never a global.
pub struct HistoryDb {
    shards: Vec<RwLock<Shard>>,
}

impl Default for HistoryDb {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryDb {
    pub fn new() -> Self {
        let shards = (0..SHARD_COUNT)
            .map(|_| {
                RwLock::new(Shard {
                    buckets: (0..BUCKETS_PER_SHARD).map(|_| Vec::new()).collect(),
                })
            })
            .collect();
        HistoryDb { shards }
    }

    fn locate(key: &str) -> (usize, usize) {
        let folded = fold_hash(keyhash(key));
        let global_bucket = folded % TOTAL_BUCKETS;
        let shard = (global_bucket / BUCKETS_PER_SHARD) as usize;
        let local_bucket = (global_bucket % BUCKETS_PER_SHARD) as usize;
        (shard, local_bucket)
    }

    /// Insert or update an entry from a freshly parsed, positional packet.
    /// Packets without `HAS_POS` are skipped outright. Object/item
    /// packets whose kill marker (`_`) is set remove the entry instead of
    /// storing it.
    pub fn insert(&self, packet: &ParsedPacket) -> InsertOutcome {
        let Some(pos) = packet.pos else { return InsertOutcome::Skipped };
        let key = packet.effective_src().to_string();
        let killed = is_killed(packet);

        let (shard_idx, bucket_idx) = Self::locate(&key);
        let mut shard = self.shards[shard_idx].write().expect("historydb shard poisoned");
        let bucket = &mut shard.buckets[bucket_idx];
        let existing = bucket.iter().position(|e| e.key.eq_ignore_ascii_case(&key));

        if killed {
            return match existing {
                Some(idx) => {
                    bucket.swap_remove(idx);
                    InsertOutcome::Killed
                }
                None => InsertOutcome::Skipped,
            };
        }

        let entry = HistoryEntry {
            key: key.clone(),
            arrival_secs: packet.arrival_tick.as_secs(),
            flags: packet.flags.bits(),
            lat: pos.lat,
            lng: pos.lng,
            cos_lat: pos.cos_lat,
        };

        match existing {
            Some(idx) => {
                bucket[idx] = entry;
                InsertOutcome::Updated
            }
            None => {
                bucket.push(entry);
                InsertOutcome::Inserted
            }
        }
    }

    /// Look up `key`'s last-known position, honoring the 5-minute
    /// validity grace.
    pub fn lookup(&self, key: &str, now: Tick, lastposition_storetime: Duration) -> Option<HistoryEntry> {
        let validity_window = lastposition_storetime.checked_sub(LOOKUP_GRACE).unwrap_or(Duration::ZERO);
        let (shard_idx, bucket_idx) = Self::locate(key);
        let shard = self.shards[shard_idx].read().expect("historydb shard poisoned");
        shard.buckets[bucket_idx]
            .iter()
            .find(|e| e.key.eq_ignore_ascii_case(key))
            .filter(|e| !e.arrival().age_exceeds(now, validity_window))
            .cloned()
    }

    /// Evict entries older than `lastposition_storetime`. Expected cadence:
    /// once per minute.
    pub fn cleanup(&self, now: Tick, lastposition_storetime: Duration) -> usize {
        let mut evicted = 0;
        for shard_lock in &self.shards {
            let mut shard = shard_lock.write().expect("historydb shard poisoned");
            for bucket in shard.buckets.iter_mut() {
                let before = bucket.len();
                bucket.retain(|e| !e.arrival().age_exceeds(now, lastposition_storetime));
                evicted += before - bucket.len();
            }
        }
        evicted
    }

    /// Total number of live entries across every shard, for the status
    /// JSON's `historydb` section.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| {
                let shard = s.read().expect("historydb shard poisoned");
                shard.buckets.iter().map(|b| b.len()).sum::<usize>()
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn all_entries(&self) -> Vec<HistoryEntry> {
        self.shards
            .iter()
            .flat_map(|s| {
                let shard = s.read().expect("historydb shard poisoned");
                shard.buckets.iter().flatten().cloned().collect::<Vec<_>>()
            })
            .collect()
    }

    pub(crate) fn insert_raw(&self, entry: HistoryEntry) {
        let (shard_idx, bucket_idx) = Self::locate(&entry.key);
        let mut shard = self.shards[shard_idx].write().expect("historydb shard poisoned");
        let bucket = &mut shard.buckets[bucket_idx];
        if let Some(idx) = bucket.iter().position(|e| e.key.eq_ignore_ascii_case(&entry.key)) {
            bucket[idx] = entry;
        } else {
            bucket.push(entry);
        }
    }
}

fn is_killed(packet: &ParsedPacket) -> bool {
    if packet.flags.contains(TypeFlags::OBJECT) {
        if let Some(&marker) = packet.info.first() {
            if marker == b';' {
                return objitem::decode_object(&packet.info[1..]).map(|o| o.killed).unwrap_or(false);
            }
        }
    }
    if packet.flags.contains(TypeFlags::ITEM) {
        if let Some(&marker) = packet.info.first() {
            if marker == b')' {
                return objitem::decode_item(&packet.info[1..]).map(|i| i.killed).unwrap_or(false);
            }
        }
    }
    false
}

/// FNV-1a over the case-folded key. Deterministic across process restarts
/// (unlike `ahash`'s randomized seed), which keeps bucket placement
/// reproducible for the dump/load round-trip test and debugging.
fn keyhash(key: &str) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut h = OFFSET;
    for b in key.bytes() {
        h ^= b.to_ascii_uppercase() as u64;
        h = h.wrapping_mul(PRIME);
    }
    h
}

/// Bucket fold: `h ^ h>>13 ^ h>>26`.
fn fold_hash(h: u64) -> u64 {
    h ^ (h >> 13) ^ (h >> 26)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tick::Clock;

    fn position_packet(src: &str, lat_deg: f64, lng_deg: f64, tick: Tick) -> ParsedPacket {
        let pos = crate::parser::position::validate_degrees(lat_deg, lng_deg).unwrap();
        ParsedPacket {
            raw: Vec::new(),
            src: src.to_string(),
            dst: "APRS".to_string(),
            path: Vec::new(),
            info: Vec::new(),
            flags: TypeFlags::POSITION,
            pos: Some(pos),
            sym_table: b'/',
            sym_code: b'-',
            src_name: None,
            dst_name: None,
            arrival_tick: tick,
            arrival_wall: Clock::new().wall(),
        }
    }

    #[test]
    fn insert_then_lookup_returns_matching_position() {
        let db = HistoryDb::new();
        let packet = position_packet("OH7LZB", 60.4752, 25.0947, Tick::from_secs(1000));
        assert_eq!(db.insert(&packet), InsertOutcome::Inserted);
        let entry = db.lookup("OH7LZB", Tick::from_secs(1000), Duration::from_secs(1800)).unwrap();
        assert!((entry.lat - packet.pos.unwrap().lat).abs() < 1e-9);
        assert!((entry.lng - packet.pos.unwrap().lng).abs() < 1e-9);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let db = HistoryDb::new();
        let packet = position_packet("oh7lzb", 60.0, 25.0, Tick::from_secs(1000));
        db.insert(&packet);
        assert!(db.lookup("OH7LZB", Tick::from_secs(1000), Duration::from_secs(1800)).is_some());
    }

    #[test]
    fn second_packet_from_same_callsign_updates_in_place() {
        let db = HistoryDb::new();
        db.insert(&position_packet("OH7LZB", 60.0, 25.0, Tick::from_secs(1000)));
        assert_eq!(db.insert(&position_packet("OH7LZB", 61.0, 26.0, Tick::from_secs(1001))), InsertOutcome::Updated);
        assert_eq!(db.len(), 1);
        let entry = db.lookup("OH7LZB", Tick::from_secs(1001), Duration::from_secs(1800)).unwrap();
        assert!((entry.lat.to_degrees() - 61.0).abs() < 1e-6);
    }

    #[test]
    fn packet_without_position_is_skipped() {
        let db = HistoryDb::new();
        let mut packet = position_packet("OH7LZB", 60.0, 25.0, Tick::from_secs(1000));
        packet.pos = None;
        assert_eq!(db.insert(&packet), InsertOutcome::Skipped);
        assert_eq!(db.len(), 0);
    }

    #[test]
    fn killed_object_is_removed_and_then_absent_from_lookup() {
        let db = HistoryDb::new();
        let pos = crate::parser::position::validate_degrees(49.0583, -72.0292).unwrap();
        let mut packet = position_packet("OH2MQK-1", 49.0583, -72.0292, Tick::from_secs(1000));
        packet.flags = TypeFlags::OBJECT;
        packet.src_name = Some("LEADER".to_string());
        packet.pos = Some(pos);
        packet.info = b";LEADER   *111111z4903.50N/07201.75W>".to_vec();
        assert_eq!(db.insert(&packet), InsertOutcome::Inserted);

        let mut kill = packet.clone();
        kill.info = b";LEADER   _111111z4903.50N/07201.75W>".to_vec();
        assert_eq!(db.insert(&kill), InsertOutcome::Killed);
        assert!(db.lookup("LEADER", Tick::from_secs(1000), Duration::from_secs(1800)).is_none());
    }

    #[test]
    fn cleanup_evicts_entries_older_than_storetime() {
        let db = HistoryDb::new();
        db.insert(&position_packet("OH7LZB", 60.0, 25.0, Tick::from_secs(0)));
        let evicted = db.cleanup(Tick::from_secs(2000), Duration::from_secs(1800));
        assert_eq!(evicted, 1);
        assert_eq!(db.len(), 0);
    }

    #[test]
    fn lookup_respects_five_minute_grace_beyond_storetime() {
        let db = HistoryDb::new();
        db.insert(&position_packet("OH7LZB", 60.0, 25.0, Tick::from_secs(0)));
        // storetime=1800s; validity window = 1800-300=1500s. At t=1400 still valid.
        assert!(db.lookup("OH7LZB", Tick::from_secs(1400), Duration::from_secs(1800)).is_some());
        // At t=1600, past the 1500s validity window (but before the 1800s cleanup horizon).
        assert!(db.lookup("OH7LZB", Tick::from_secs(1600), Duration::from_secs(1800)).is_none());
    }

    #[test]
    fn dump_load_round_trip_preserves_in_window_entries() {
        let db = HistoryDb::new();
        db.insert(&position_packet("OH7LZB", 60.4752, 25.0947, Tick::from_secs(1000)));
        db.insert(&position_packet("N0CALL", 10.0, 10.0, Tick::from_secs(1001)));

        let mut buf = Vec::new();
        dump::dump_to_writer(&db, &mut buf).unwrap();

        let loaded = HistoryDb::new();
        dump::load_from_reader(&loaded, &buf[..], Tick::from_secs(0)).unwrap();

        let mut original = db.all_entries();
        let mut reloaded = loaded.all_entries();
        original.sort_by(|a, b| a.key.cmp(&b.key));
        reloaded.sort_by(|a, b| a.key.cmp(&b.key));
        assert_eq!(original, reloaded);
    }
}
