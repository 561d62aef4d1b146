//! Per-client heard/courtesy lists (C5): which callsigns this client has
//! recently sent ("heard") and which have recently sent to it ("courtesy"),
//! used to decide where to route message traffic.
//!
//! Each client owns exactly one [`ClientLists`], touched only by the worker
//! task that owns the client's socket — no locking, matching the ownership
//! rule the rest of the core follows (history is shared and locked, heard
//! lists are private and bare). The bucket chains are realized the same
//! "arena with indices" way as [`crate::cellpool`]: a flat `Vec<Entry>`
//! with free slots threaded through an intrusive free list and prev/next
//! links stored as indices rather than pointers, giving O(1) move-to-front
//! without unsafe code.

use serde::{Deserialize, Serialize};

use crate::tick::Tick;

const BUCKET_COUNT: usize = 16;
const SENTINEL: usize = usize::MAX;

struct Entry {
    callsign: String,
    last_heard: Tick,
    prev: usize,
    next: usize,
    free_next: usize,
    occupied: bool,
}

/// One 16-bucket chained table. [`ClientLists`] holds two of these: one for
/// `heard`, one for `courtesy`.
struct HeardTable {
    entries: Vec<Entry>,
    buckets: [usize; BUCKET_COUNT],
    free_head: usize,
}

impl HeardTable {
    fn new() -> Self {
        HeardTable { entries: Vec::new(), buckets: [SENTINEL; BUCKET_COUNT], free_head: SENTINEL }
    }

    fn bucket_of(callsign: &str) -> usize {
        let h = keyhash(callsign);
        ((h ^ (h >> 16)) % BUCKET_COUNT as u32) as usize
    }

    fn find(&self, callsign: &str) -> Option<usize> {
        let bucket = Self::bucket_of(callsign);
        let mut idx = self.buckets[bucket];
        while idx != SENTINEL {
            let entry = &self.entries[idx];
            if entry.callsign.eq_ignore_ascii_case(callsign) {
                return Some(idx);
            }
            idx = entry.next;
        }
        None
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next, bucket) = {
            let entry = &self.entries[idx];
            (entry.prev, entry.next, Self::bucket_of(&entry.callsign))
        };
        if prev != SENTINEL {
            self.entries[prev].next = next;
        } else {
            self.buckets[bucket] = next;
        }
        if next != SENTINEL {
            self.entries[next].prev = prev;
        }
    }

    fn push_front(&mut self, bucket: usize, idx: usize) {
        let old_head = self.buckets[bucket];
        self.entries[idx].prev = SENTINEL;
        self.entries[idx].next = old_head;
        if old_head != SENTINEL {
            self.entries[old_head].prev = idx;
        }
        self.buckets[bucket] = idx;
    }

    fn alloc(&mut self, callsign: String, last_heard: Tick) -> usize {
        let idx = if self.free_head != SENTINEL {
            let idx = self.free_head;
            self.free_head = self.entries[idx].free_next;
            self.entries[idx] = Entry { callsign, last_heard, prev: SENTINEL, next: SENTINEL, free_next: SENTINEL, occupied: true };
            idx
        } else {
            self.entries.push(Entry { callsign, last_heard, prev: SENTINEL, next: SENTINEL, free_next: SENTINEL, occupied: true });
            self.entries.len() - 1
        };
        idx
    }

    fn free(&mut self, idx: usize) {
        self.unlink(idx);
        self.entries[idx].occupied = false;
        self.entries[idx].callsign.clear();
        self.entries[idx].free_next = self.free_head;
        self.free_head = idx;
    }

    /// Insert or refresh `callsign`, moving it to the front of its bucket.
    fn update(&mut self, callsign: &str, now: Tick) {
        if let Some(idx) = self.find(callsign) {
            self.entries[idx].last_heard = now;
            let bucket = Self::bucket_of(callsign);
            self.unlink(idx);
            self.push_front(bucket, idx);
            return;
        }
        let bucket = Self::bucket_of(callsign);
        let idx = self.alloc(callsign.to_string(), now);
        self.push_front(bucket, idx);
    }

    fn check(&self, callsign: &str) -> bool {
        self.find(callsign).is_some()
    }

    /// Returns `true` and removes the entry if present.
    fn check_and_remove(&mut self, callsign: &str) -> bool {
        match self.find(callsign) {
            Some(idx) => {
                self.free(idx);
                true
            }
            None => false,
        }
    }

    fn expire(&mut self, now: Tick, storetime: std::time::Duration) {
        let stale: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.occupied && e.last_heard.age_exceeds(now, storetime))
            .map(|(idx, _)| idx)
            .collect();
        for idx in stale {
            self.free(idx);
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.buckets = [SENTINEL; BUCKET_COUNT];
        self.free_head = SENTINEL;
    }

    fn snapshot(&self) -> Vec<HeardRecord> {
        self.entries
            .iter()
            .filter(|e| e.occupied)
            .map(|e| HeardRecord { callsign: e.callsign.clone(), last_heard_secs: e.last_heard.as_secs() })
            .collect()
    }

    fn restore(&mut self, records: Vec<HeardRecord>) {
        self.clear();
        for record in records {
            self.update(&record.callsign, Tick::from_secs(record.last_heard_secs));
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HeardRecord {
    callsign: String,
    last_heard_secs: u64,
}

/// The two tables a single client owns.
pub struct ClientLists {
    heard: HeardTable,
    courtesy: HeardTable,
}

impl Default for ClientLists {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientLists {
    pub fn new() -> Self {
        ClientLists { heard: HeardTable::new(), courtesy: HeardTable::new() }
    }

    pub fn update_heard(&mut self, callsign: &str, now: Tick) {
        self.heard.update(callsign, now);
    }

    pub fn update_courtesy(&mut self, callsign: &str, now: Tick) {
        self.courtesy.update(callsign, now);
    }

    pub fn check_heard(&self, callsign: &str) -> bool {
        self.heard.check(callsign)
    }

    /// Checks whether a courtesy-forward is owed to `callsign`, consuming
    /// the entry on a hit so the courtesy forward happens at most once.
    pub fn check_courtesy_needed(&mut self, callsign: &str) -> bool {
        self.courtesy.check_and_remove(callsign)
    }

    pub fn expire(&mut self, now: Tick, storetime: std::time::Duration) {
        self.heard.expire(now, storetime);
        self.courtesy.expire(now, storetime);
    }

    pub fn free_all(&mut self) {
        self.heard.clear();
        self.courtesy.clear();
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "heard": self.heard.snapshot(),
            "courtesy": self.courtesy.snapshot(),
        })
    }

    pub fn load_from_json(&mut self, value: &serde_json::Value) -> Result<(), serde_json::Error> {
        if let Some(heard) = value.get("heard") {
            let records: Vec<HeardRecord> = serde_json::from_value(heard.clone())?;
            self.heard.restore(records);
        }
        if let Some(courtesy) = value.get("courtesy") {
            let records: Vec<HeardRecord> = serde_json::from_value(courtesy.clone())?;
            self.courtesy.restore(records);
        }
        Ok(())
    }
}

/// FNV-1a over the case-folded callsign, folded `h ^ h>>16` modulo the
/// bucket count.
fn keyhash(callsign: &str) -> u32 {
    const OFFSET: u32 = 2166136261;
    const PRIME: u32 = 16777619;
    let mut h = OFFSET;
    for b in callsign.bytes() {
        h ^= b.to_ascii_uppercase() as u32;
        h = h.wrapping_mul(PRIME);
    }
    h
}
