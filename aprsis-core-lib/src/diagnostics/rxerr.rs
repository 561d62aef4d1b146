//! `rx_errs` histogram: one atomic counter per [`crate::parser::ParseError`]
//! label, surfaced verbatim under the status JSON's `rx_errs` section and
//! exported into the live-upgrade compatibility table.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::parser::ParseError;

/// Lock-free counter array, one slot per closed [`ParseError`] variant.
/// Indexed positionally against [`ParseError::ALL`] rather than keyed by a
/// hash map, since the taxonomy is small and fixed at compile time.
#[derive(Debug, Default)]
pub struct RxErrCounters {
    counts: [AtomicU64; ParseError::ALL.len()],
}

impl RxErrCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, err: ParseError) {
        if let Some(idx) = ParseError::ALL.iter().position(|&e| e == err) {
            self.counts[idx].fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Snapshot as `(label, count)` pairs in the order of [`ParseError::ALL`],
    /// matching the label table the live-upgrade file ships for
    /// compatibility validation.
    pub fn snapshot(&self) -> Vec<(&'static str, u64)> {
        ParseError::ALL
            .iter()
            .zip(self.counts.iter())
            .map(|(err, c)| (err.label(), c.load(Ordering::Relaxed)))
            .collect()
    }

    /// The labels alone, for the live-upgrade file's compatibility table.
    pub fn labels() -> Vec<&'static str> {
        ParseError::ALL.iter().map(|e| e.label()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_increments_only_the_matching_label() {
        let counters = RxErrCounters::new();
        counters.record(ParseError::DisDx);
        counters.record(ParseError::DisDx);
        counters.record(ParseError::InvSrcCall);

        let snapshot = counters.snapshot();
        let dis_dx = snapshot.iter().find(|(label, _)| *label == "DIS_DX").unwrap();
        let inv_src = snapshot.iter().find(|(label, _)| *label == "INV_SRCCALL").unwrap();
        assert_eq!(dis_dx.1, 2);
        assert_eq!(inv_src.1, 1);
    }
}
