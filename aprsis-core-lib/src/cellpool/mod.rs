//! Fixed-size object pool with FIFO free-list reuse.
//!
//! Grounded on the original's `cellmalloc` arena: memory is claimed in
//! fixed-size blocks and handed out cell by cell, with freed cells queued
//! for reuse rather than returned to the system allocator. The FIFO policy
//! (oldest freed cell reused first) spreads writes across the whole arena
//! instead of hammering the most-recently-freed slot, which is what makes
//! use-after-free bugs show up quickly under a sanitizer.
//!
//! Rust gives us a safe equivalent for free: a `Vec<Slot<T>>` arena where
//! "pointers" are indices and the free list is threaded through the unused
//! slots themselves — the same "arena with indices" discipline the heard
//! list ([`crate::client_heard`]) uses for its backpointers.

use std::sync::Mutex;

const DEFAULT_BLOCK_CELLS: usize = 4096;

enum Slot<T> {
    Occupied(T),
    Free { next_free: Option<usize> },
}

struct Inner<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<usize>,
    free_tail: Option<usize>,
    cells_used: usize,
    block_cells: usize,
    blocks_allocated: usize,
}

/// A single typed pool. One instance per cell kind (history entries, dupe
/// entries, ...) so each can report its own stats on the status surface.
pub struct CellPool<T> {
    name: &'static str,
    inner: Mutex<Inner<T>>,
}

/// Snapshot of a pool's usage, surfaced verbatim under the `memory` section
/// of the status JSON (`{pool}_cells_used`, `{pool}_cells_free`, ...).
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct CellPoolStats {
    pub pool: &'static str,
    pub cells_used: usize,
    pub cells_free: usize,
    pub blocks: usize,
    pub block_cells: usize,
    pub cell_size: usize,
}

impl<T> CellPool<T> {
    pub fn new(name: &'static str) -> Self {
        Self::with_block_cells(name, DEFAULT_BLOCK_CELLS)
    }

    pub fn with_block_cells(name: &'static str, block_cells: usize) -> Self {
        CellPool {
            name,
            inner: Mutex::new(Inner {
                slots: Vec::new(),
                free_head: None,
                free_tail: None,
                cells_used: 0,
                block_cells: block_cells.max(1),
                blocks_allocated: 0,
            }),
        }
    }

    /// Claim a cell, growing the arena by a whole block if the free list is
    /// empty. Never fails in this implementation (growth uses the ordinary
    /// allocator and aborts the process on OOM like any other `Vec` growth,
    /// matching the "degrade gracefully, but a hard OOM is still fatal"
    /// posture of the original); callers that want bounded memory should
    /// size `block_cells` accordingly and treat the returned index as the
    /// cell's lifetime handle.
    pub fn alloc(&self, value: T) -> usize {
        let mut inner = self.inner.lock().expect("cellpool mutex poisoned");
        if let Some(idx) = inner.free_head {
            let next_free = match &inner.slots[idx] {
                Slot::Free { next_free } => *next_free,
                Slot::Occupied(_) => unreachable!("free list pointed at occupied slot"),
            };
            inner.free_head = next_free;
            if inner.free_head.is_none() {
                inner.free_tail = None;
            }
            inner.slots[idx] = Slot::Occupied(value);
            inner.cells_used += 1;
            return idx;
        }

        let block_cells = inner.block_cells;
        inner.blocks_allocated += 1;
        let start = inner.slots.len();
        inner.slots.reserve(block_cells);
        for _ in 0..block_cells {
            inner.slots.push(Slot::Free { next_free: None });
        }
        // Thread a fresh free chain through the rest of the new block so
        // future allocs reuse it FIFO before growing again.
        for i in start..inner.slots.len() - 1 {
            inner.slots[i] = Slot::Free { next_free: Some(i + 1) };
        }
        let tail = inner.slots.len() - 1;
        match inner.free_tail {
            Some(old_tail) => {
                inner.slots[old_tail] = Slot::Free { next_free: Some(start) };
            }
            None => inner.free_head = Some(start),
        }
        inner.free_tail = Some(tail);

        let idx = inner.free_head.expect("just grew the arena");
        let next_free = match &inner.slots[idx] {
            Slot::Free { next_free } => *next_free,
            Slot::Occupied(_) => unreachable!(),
        };
        inner.free_head = next_free;
        if inner.free_head.is_none() {
            inner.free_tail = None;
        }
        inner.slots[idx] = Slot::Occupied(value);
        inner.cells_used += 1;
        idx
    }

    /// Return a cell to the FIFO free list. Double-free is a logic error in
    /// the caller and is reported rather than silently ignored.
    pub fn free(&self, idx: usize) -> Option<T> {
        let mut inner = self.inner.lock().expect("cellpool mutex poisoned");
        let slot = inner.slots.get_mut(idx)?;
        let value = match std::mem::replace(slot, Slot::Free { next_free: None }) {
            Slot::Occupied(v) => v,
            Slot::Free { .. } => return None,
        };
        match inner.free_tail {
            Some(tail) => {
                inner.slots[tail] = Slot::Free { next_free: Some(idx) };
            }
            None => inner.free_head = Some(idx),
        }
        inner.free_tail = Some(idx);
        inner.cells_used -= 1;
        Some(value)
    }

    pub fn with<R>(&self, idx: usize, f: impl FnOnce(&T) -> R) -> Option<R> {
        let inner = self.inner.lock().expect("cellpool mutex poisoned");
        match inner.slots.get(idx) {
            Some(Slot::Occupied(v)) => Some(f(v)),
            _ => None,
        }
    }

    pub fn stats(&self) -> CellPoolStats {
        let inner = self.inner.lock().expect("cellpool mutex poisoned");
        CellPoolStats {
            pool: self.name,
            cells_used: inner.cells_used,
            cells_free: inner.slots.len() - inner.cells_used,
            blocks: inner.blocks_allocated,
            block_cells: inner.block_cells,
            cell_size: std::mem::size_of::<T>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_free_reuses_fifo() {
        let pool: CellPool<u32> = CellPool::with_block_cells("test", 4);
        let a = pool.alloc(1);
        let b = pool.alloc(2);
        pool.free(a);
        pool.free(b);
        // FIFO: a was freed first, so it's reused first.
        let c = pool.alloc(3);
        assert_eq!(c, a);
    }

    #[test]
    fn stats_track_usage_across_a_block_boundary() {
        let pool: CellPool<u32> = CellPool::with_block_cells("test", 2);
        let _a = pool.alloc(1);
        let _b = pool.alloc(2);
        let _c = pool.alloc(3); // forces a second block
        let stats = pool.stats();
        assert_eq!(stats.cells_used, 3);
        assert_eq!(stats.blocks, 2);
    }

    #[test]
    fn free_returns_value_and_vacates_slot() {
        let pool: CellPool<String> = CellPool::with_block_cells("test", 4);
        let idx = pool.alloc("hello".to_string());
        assert_eq!(pool.free(idx), Some("hello".to_string()));
        assert_eq!(pool.with(idx, |v| v.clone()), None);
    }
}
