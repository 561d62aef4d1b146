//! Ambient error taxonomy support (part of C11): the `rx_errs` histogram
//! every dropped or downgraded packet increments, and a small named-alarm
//! list operators can see on the status surface.
//!
//! Per-packet failures never propagate as a crate-level [`crate::error::CoreError`]
//! — that type is reserved for startup/config/IO failures. A parse failure
//! just bumps a counter here and the packet is dropped; the connection survives.

mod alarm;
mod rxerr;

pub use alarm::{Alarm, AlarmTable};
pub use rxerr::RxErrCounters;
