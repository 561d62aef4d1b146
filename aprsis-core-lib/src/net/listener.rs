//! Accept loop (C9), grounded in the teacher's `tcp::handler::TcpHandler::run`:
//! `tokio::select!` between `TcpListener::accept()` and a shutdown watch
//! channel, spawning one task per accepted connection.

use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use super::worker;
use super::Shared;

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("bind failed: {0}")]
    Bind(std::io::Error),
}

pub struct Listener {
    shared: Shared,
}

impl Listener {
    pub fn new(shared: Shared) -> Self {
        Listener { shared }
    }

    pub async fn run(&self, listener: TcpListener, mut shutdown: watch::Receiver<bool>) {
        loop {
            let accepted = tokio::select! {
                res = listener.accept() => res,
                res = shutdown.changed() => {
                    if res.is_ok() {
                        info!("shutdown signal received, stopping accept loop");
                    }
                    break;
                }
            };

            let (stream, addr) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "failed to accept connection");
                    continue;
                }
            };
            info!(%addr, clients = self.shared.registry.len(), "accepted connection");

            let shared = self.shared.clone();
            tokio::spawn(async move {
                worker::serve(stream, addr, shared).await;
            });
        }
    }
}

/// Bind `shared.config.listen` and run the accept loop until `shutdown`
/// fires. Matches the teacher's free-standing `tcp::run` entry point.
pub async fn run(shared: Shared, shutdown: watch::Receiver<bool>) -> Result<(), ListenerError> {
    let listener = TcpListener::bind(shared.config.listen).await.map_err(ListenerError::Bind)?;
    info!(addr = ?shared.config.listen, "aprs-is listener bound");

    let l = Listener::new(shared);
    l.run(listener, shutdown).await;
    Ok(())
}
