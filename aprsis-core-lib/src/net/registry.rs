//! Shared client registry: lets the worker that ingests a packet fan it out
//! to every other connected client without ever touching that client's
//! owned state directly (§5's "no cross-worker access" rule). Each entry is
//! a handle carrying only the other worker's inbox sender, an outstanding
//! byte counter for write-queue backpressure, and a status snapshot the
//! owning worker refreshes periodically for C10.
//!
//! Keyed with `ahash` the way the teacher's `TcpHandler` hashes client
//! addresses for backend selection, and stored in a `DashMap` so readers
//! (fan-out) and writers (connect/disconnect) never block each other on a
//! single global lock.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use ahash::RandomState;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::parser::ParsedPacket;

/// Point-in-time client state, for the status JSON's `clients` section.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClientSnapshot {
    pub callsign: String,
    pub verified: bool,
    pub addr: String,
    pub connected_since_secs: u64,
    pub pkts_in: u64,
    pub pkts_out: u64,
}

/// One connected client's shared-visible state. Owned jointly: the
/// registry holds it so other workers can reach it, but only the owning
/// worker ever drains `inbox` or updates `snapshot`.
pub struct ClientHandle {
    pub id: u64,
    pub addr: SocketAddr,
    inbox: mpsc::Sender<Arc<ParsedPacket>>,
    outstanding_bytes: AtomicUsize,
    max_write_queue_bytes: usize,
    disconnect: AtomicBool,
    snapshot: ArcSwap<ClientSnapshot>,
}

impl ClientHandle {
    fn new(id: u64, addr: SocketAddr, inbox: mpsc::Sender<Arc<ParsedPacket>>, max_write_queue_bytes: usize) -> Self {
        ClientHandle {
            id,
            addr,
            inbox,
            outstanding_bytes: AtomicUsize::new(0),
            max_write_queue_bytes,
            disconnect: AtomicBool::new(false),
            snapshot: ArcSwap::from_pointee(ClientSnapshot {
                callsign: String::new(),
                verified: false,
                addr: addr.to_string(),
                connected_since_secs: 0,
                pkts_in: 0,
                pkts_out: 0,
            }),
        }
    }

    /// Try to enqueue `packet` into this client's inbox, tracking the byte
    /// cost against the per-client write-queue cap. Returns `false` (and
    /// marks the client for disconnection) if the cap would be exceeded or
    /// the inbox is gone.
    pub fn try_enqueue(&self, packet: &Arc<ParsedPacket>) -> bool {
        let len = packet.raw.len();
        let prev = self.outstanding_bytes.fetch_add(len, Ordering::AcqRel);
        if prev + len > self.max_write_queue_bytes {
            self.outstanding_bytes.fetch_sub(len, Ordering::AcqRel);
            self.disconnect.store(true, Ordering::Release);
            return false;
        }
        if self.inbox.try_send(packet.clone()).is_err() {
            self.outstanding_bytes.fetch_sub(len, Ordering::AcqRel);
            return false;
        }
        true
    }

    /// Acknowledge that the owning worker has dequeued and processed a
    /// packet of `len` raw bytes, releasing it from the write-queue cap.
    pub fn ack_dequeue(&self, len: usize) {
        self.outstanding_bytes.fetch_sub(len, Ordering::AcqRel);
    }

    pub fn mark_disconnect(&self) {
        self.disconnect.store(true, Ordering::Release);
    }

    pub fn should_disconnect(&self) -> bool {
        self.disconnect.load(Ordering::Acquire)
    }

    pub fn update_snapshot(&self, snapshot: ClientSnapshot) {
        self.snapshot.store(Arc::new(snapshot));
    }

    pub fn snapshot(&self) -> Arc<ClientSnapshot> {
        self.snapshot.load_full()
    }
}

/// Process-wide table of connected clients, constructed once and shared by
/// `Arc` across every accept-loop spawned worker.
pub struct ClientRegistry {
    clients: DashMap<u64, Arc<ClientHandle>, RandomState>,
    next_id: AtomicU64,
    connects_total: AtomicU64,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientRegistry {
    pub fn new() -> Self {
        ClientRegistry {
            clients: DashMap::with_hasher(RandomState::default()),
            next_id: AtomicU64::new(1),
            connects_total: AtomicU64::new(0),
        }
    }

    /// Register a newly accepted client, returning its handle and the
    /// receiving end of its inbox for the owning worker to drain.
    pub fn register(
        &self,
        addr: SocketAddr,
        max_write_queue_bytes: usize,
        inbox_capacity: usize,
    ) -> (Arc<ClientHandle>, mpsc::Receiver<Arc<ParsedPacket>>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(inbox_capacity.max(1));
        let handle = Arc::new(ClientHandle::new(id, addr, tx, max_write_queue_bytes));
        self.clients.insert(id, handle.clone());
        self.connects_total.fetch_add(1, Ordering::Relaxed);
        (handle, rx)
    }

    /// Lifetime connect count since process start, surfaced as the status
    /// JSON's `totals.connects_today` field (see `DESIGN.md` for why this
    /// tracks the process lifetime rather than a calendar day).
    pub fn connects_total(&self) -> u64 {
        self.connects_total.load(Ordering::Relaxed)
    }

    pub fn unregister(&self, id: u64) {
        self.clients.remove(&id);
    }

    /// Hand `packet` to every other connected client's inbox. The packet
    /// itself is never touched by the ingesting worker beyond this —
    /// filtering and writing happen in each receiving client's own task.
    pub fn broadcast_except(&self, origin: u64, packet: &Arc<ParsedPacket>) {
        for entry in self.clients.iter() {
            if *entry.key() == origin {
                continue;
            }
            entry.value().try_enqueue(packet);
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn snapshots(&self) -> Vec<Arc<ClientSnapshot>> {
        self.clients.iter().map(|e| e.value().snapshot()).collect()
    }
}
