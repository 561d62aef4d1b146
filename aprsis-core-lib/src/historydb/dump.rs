//! Newline-delimited JSON dump/load for the history table, used by the
//! live-upgrade handoff and by operators inspecting table contents offline.

use std::io::{self, BufRead, Write};

use thiserror::Error;

use crate::tick::Tick;

use super::{HistoryDb, HistoryEntry};

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("i/o error during history dump: {0}")]
    Io(#[from] io::Error),
    #[error("malformed history dump line {line}: {source}")]
    Decode { line: usize, source: serde_json::Error },
}

/// Write every live entry as one JSON object per line.
pub fn dump_to_writer<W: Write>(db: &HistoryDb, mut out: W) -> Result<(), DumpError> {
    for entry in db.all_entries() {
        let line = serde_json::to_string(&entry).expect("HistoryEntry serialization cannot fail");
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Load entries from a previous dump, discarding anything older than
/// `expiry` so a dump from a long-dead process doesn't resurrect stale
/// positions after a live upgrade.
pub fn load_from_reader<R: std::io::Read>(db: &HistoryDb, reader: R, expiry: Tick) -> Result<usize, DumpError> {
    let mut loaded = 0;
    for (idx, line) in io::BufReader::new(reader).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: HistoryEntry =
            serde_json::from_str(&line).map_err(|source| DumpError::Decode { line: idx + 1, source })?;
        if Tick::from_secs(entry.arrival_secs) < expiry {
            continue;
        }
        db.insert_raw(entry);
        loaded += 1;
    }
    Ok(loaded)
}
