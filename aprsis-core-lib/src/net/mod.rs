//! Connection acceptor and per-client worker runtime (C9).
//!
//! Grounded in the teacher's `tcp` module shape: a `Listener` accepting
//! connections in a `tokio::select!` loop against a shutdown watch channel
//! (`tcp::handler::TcpHandler::run`), each accepted socket handed to a
//! freshly spawned task that owns it for its whole lifetime.

pub mod listener;
pub mod login;
pub mod registry;
mod worker;

pub use listener::{run, Listener};
pub use registry::{ClientHandle, ClientRegistry, ClientSnapshot};

use std::sync::Arc;

use crate::config::Config;
use crate::diagnostics::{AlarmTable, RxErrCounters};
use crate::historydb::HistoryDb;
use crate::tick::Clock;

use crate::dedupe::DedupeEngine;

/// Everything a worker needs beyond the socket it owns: shared,
/// cheaply-`Arc`-cloned state, constructed once in `main` (§3, §5).
#[derive(Clone)]
pub struct Shared {
    pub config: Arc<Config>,
    pub history: Arc<HistoryDb>,
    pub dedupe: Arc<DedupeEngine>,
    pub rxerr: Arc<RxErrCounters>,
    pub alarms: Arc<AlarmTable>,
    pub clock: Arc<Clock>,
    pub registry: Arc<ClientRegistry>,
}
