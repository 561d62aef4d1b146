#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aprsis_core_lib::config::{load_from_path, LoggingConfig};
use aprsis_core_lib::diagnostics::{AlarmTable, RxErrCounters};
use aprsis_core_lib::dedupe::DedupeEngine;
use aprsis_core_lib::historydb::HistoryDb;
use aprsis_core_lib::liveupgrade::{self, Document};
use aprsis_core_lib::net::{run as run_listener, ClientRegistry, Shared};
use aprsis_core_lib::status;
use aprsis_core_lib::tick::Clock;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Grace period the accept loops are given to stop and in-flight client
/// writes to flush before the process exits on SIGTERM/SIGINT.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(author, version, about = "aprsis-core: an APRS-IS server core")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    /// Load a live-upgrade handoff document from this path on startup
    /// instead of `Config::live_upgrade_path`.
    #[arg(long, value_name = "FILE")]
    live_upgrade_from: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_from_path(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            // Config parsing happens before `init_tracing`, so fall back to
            // a bare default filter for this one line.
            tracing_subscriber::fmt().with_env_filter(EnvFilter::new("error")).init();
            error!(%err, path = %cli.config.display(), "failed to load configuration");
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging);
    info!(listen = %config.listen, server_callsign = %config.server_callsign, "configuration loaded");

    let clock = Arc::new(Clock::new());
    let dedupe = Arc::new(DedupeEngine::new(config.dedup_window_secs));
    let shared = Shared {
        config: Arc::new(config),
        history: Arc::new(HistoryDb::new()),
        dedupe,
        rxerr: Arc::new(RxErrCounters::new()),
        alarms: Arc::new(AlarmTable::new()),
        clock,
        registry: Arc::new(ClientRegistry::new()),
    };

    let live_upgrade_path = cli.live_upgrade_from.as_deref().unwrap_or(&shared.config.live_upgrade_path);
    match liveupgrade::load_and_retire(live_upgrade_path) {
        Ok(Some(doc)) => {
            info!(
                clients = doc.clients.len(),
                "loaded live-upgrade handoff document; per-client reattachment is not implemented \
                 (see DESIGN.md), so recovered clients must reconnect"
            );
        }
        Ok(None) => {}
        Err(err) => warn!(%err, "failed to load live-upgrade handoff document, starting cold"),
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let listener_shared = shared.clone();
    let listener_shutdown = shutdown_rx.clone();
    let listener_task = tokio::spawn(async move {
        if let Err(err) = run_listener(listener_shared, listener_shutdown).await {
            error!(%err, "aprs-is listener exited with error");
        }
    });

    let status_task = shared.config.status_listen.map(|addr| {
        let status_shared = shared.clone();
        let status_shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            if let Err(err) = status::run(addr, status_shared, status_shutdown).await {
                error!(%err, "status http listener exited with error");
            }
        })
    });

    wait_for_signal(&shared).await;

    let _ = shutdown_tx.send(true);
    tokio::time::sleep(SHUTDOWN_GRACE).await;
    listener_task.abort();
    if let Some(task) = status_task {
        task.abort();
    }
    info!("shutdown complete");
}

/// Block until SIGTERM, SIGINT, or (on Unix) SIGUSR2 arrives. SIGUSR2
/// triggers the live-upgrade save path and returns so the caller proceeds
/// with the ordinary shutdown sequence; SIGTERM/SIGINT return directly.
#[cfg(unix)]
async fn wait_for_signal(shared: &Shared) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigusr2 = signal(SignalKind::user_defined2()).expect("failed to install SIGUSR2 handler");

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("received SIGTERM, draining");
                return;
            }
            _ = sigint.recv() => {
                info!("received SIGINT, draining");
                return;
            }
            _ = sigusr2.recv() => {
                info!("received SIGUSR2, saving live-upgrade handoff document");
                save_live_upgrade(shared);
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal(_shared: &Shared) {
    let _ = tokio::signal::ctrl_c().await;
    info!("received ctrl-c, draining");
}

/// Save a live-upgrade handoff document. Per-client state isn't captured
/// here: each worker task owns its `ClientLists` exclusively (§5) and
/// there is no request/response channel yet for a worker to hand a
/// snapshot back to `main`, so this saves the process-wide counters only
/// — connected clients reconnect fresh after the upgrade, same as the
/// cold-start path when no handoff document is present at all.
#[cfg(unix)]
fn save_live_upgrade(shared: &Shared) {
    let doc = Document::new(Vec::new());
    if let Err(err) = liveupgrade::save(&shared.config.live_upgrade_path, &doc) {
        warn!(%err, "failed to save live-upgrade handoff document");
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(logging.level.clone()));
    let subscriber = tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false);
    if logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
