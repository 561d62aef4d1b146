//! HTTP status surface (C10): serves the cached `/status.json` document and
//! a Prometheus `/metrics` exposition on one plain-HTTP listener.
//!
//! Grounded in the teacher's `telemetry::metrics::start_metrics_server` /
//! `telemetry::metrics_handler::handle_metrics` pair — same hyper-1
//! `service_fn` + `hyper_util::server::conn::auto::Builder` plumbing —
//! extended to route on `req.uri().path()` instead of serving a single
//! fixed endpoint, and accepting the same shutdown `watch::Receiver` the
//! client-facing listener uses (§9) rather than its own signal handlers.

use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use prometheus::{Encoder, Registry, TextEncoder};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::net::Shared;

use super::cache::StatusCache;
use super::metrics::{self, Metrics};

type RespBody = BoxBody<Bytes, hyper::Error>;

#[derive(Debug, Error)]
pub enum StatusServerError {
    #[error("bind failed: {0}")]
    Bind(std::io::Error),
    #[error("failed to wire metrics exporter: {0}")]
    Metrics(Box<dyn std::error::Error + Send + Sync>),
}

fn plain(status: StatusCode, body: &'static str) -> Response<RespBody> {
    let boxed = Full::new(Bytes::from(body)).map_err(|never| match never {}).boxed();
    let mut resp = Response::new(boxed);
    *resp.status_mut() = status;
    resp
}

fn json_response(body: String) -> Response<RespBody> {
    let boxed = Full::new(Bytes::from(body)).map_err(|never| match never {}).boxed();
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(boxed)
        .unwrap_or_else(|_| plain(StatusCode::INTERNAL_SERVER_ERROR, "failed to build response"))
}

fn metrics_response(registry: &Registry) -> Response<RespBody> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return plain(StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics");
    }
    let boxed = Full::new(Bytes::from(buffer)).map_err(|never| match never {}).boxed();
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", encoder.format_type())
        .body(boxed)
        .unwrap_or_else(|_| plain(StatusCode::INTERNAL_SERVER_ERROR, "failed to build response"))
}

async fn handle(req: Request<Incoming>, shared: Shared, cache: Arc<StatusCache>, registry: Arc<Registry>) -> Result<Response<RespBody>, hyper::Error> {
    let response = match req.uri().path() {
        "/status.json" => json_response(cache.json(&shared, &shared.clock)),
        "/metrics" => metrics_response(&registry),
        _ => plain(StatusCode::NOT_FOUND, "not found"),
    };
    Ok(response)
}

/// Bind `addr` and serve the status surface until `shutdown` fires.
/// Mirrors `net::listener::run`'s accept-loop shape so the two listeners
/// read identically in the binary's startup sequence.
pub async fn run(addr: SocketAddr, shared: Shared, mut shutdown: watch::Receiver<bool>) -> Result<(), StatusServerError> {
    let (metrics, registry) = metrics::init(shared.clone()).map_err(StatusServerError::Metrics)?;
    let metrics: Arc<Metrics> = Arc::new(metrics);
    let registry = Arc::new(registry);
    let cache = Arc::new(StatusCache::new(&shared.clock));

    let listener = TcpListener::bind(addr).await.map_err(StatusServerError::Bind)?;
    info!(?addr, "status http listener bound");

    loop {
        let accepted = tokio::select! {
            res = listener.accept() => res,
            res = shutdown.changed() => {
                if res.is_ok() {
                    info!("shutdown signal received, stopping status listener");
                }
                break;
            }
        };

        let (stream, peer) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "status listener accept error");
                continue;
            }
        };

        let shared = shared.clone();
        let cache = cache.clone();
        let registry = registry.clone();
        let _metrics = metrics.clone();
        tokio::spawn(async move {
            let svc = hyper::service::service_fn(move |req| {
                handle(req, shared.clone(), cache.clone(), registry.clone())
            });
            let builder = ConnBuilder::new(TokioExecutor::new());
            if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
                warn!(%peer, error = %e, "status listener serve_connection error");
            }
        });
    }

    info!("status http listener stopped");
    Ok(())
}
