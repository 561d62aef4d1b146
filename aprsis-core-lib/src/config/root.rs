use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;

use super::logging::LoggingConfig;

/// Main configuration structure: an immutable, `Arc`-shared snapshot of
/// everything read from the TOML config file plus CLI overrides.
/// Constructed once at startup; a config reload produces a new `Config`
/// and swaps the `Arc` rather than mutating one in place.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Client-facing APRS-IS listener address.
    /// Example: "0.0.0.0:14580"
    pub listen: SocketAddr,
    /// Identity string reported in the login banner comment line.
    /// Example: "aprsis-core 1.0"
    pub server_id: String,
    /// Callsign this server identifies itself as in Q-construct tagging.
    /// Example: "OH7AA"
    pub server_callsign: String,
    /// HTTP status/metrics bind address. `None` disables the status
    /// surface entirely.
    /// Default: None
    #[serde(default)]
    pub status_listen: Option<SocketAddr>,
    /// Sliding window, in seconds, the dedup engine holds recent packet
    /// bodies for.
    /// Default: 30
    #[serde(default = "default_dedup_window_secs")]
    pub dedup_window_secs: u64,
    /// History table expiry horizon, in seconds. Must exceed the 300s
    /// lookup validity grace.
    /// Default: 1800
    #[serde(default = "default_lastposition_storetime_secs")]
    pub lastposition_storetime_secs: u64,
    /// Per-client read idle disconnect, in seconds.
    /// Default: 172800 (48 hours)
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Per-client outbound backpressure cap, in bytes.
    /// Default: 262144 (256 KiB)
    #[serde(default = "default_max_write_queue_bytes")]
    pub max_write_queue_bytes: usize,
    /// Wire frame length cap; frames past this are rejected as
    /// `PKT_TOO_LONG`.
    /// Default: 512
    #[serde(default = "default_max_packet_len")]
    pub max_packet_len: usize,
    /// Tokio worker thread count. `None` defers to the runtime's
    /// CPU-count heuristic.
    /// Default: None
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// Where the live-upgrade handoff document is written on shutdown
    /// and read from on startup.
    /// Default: "./liveupgrade.json"
    #[serde(default = "default_live_upgrade_path")]
    pub live_upgrade_path: PathBuf,
    /// Structured logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_dedup_window_secs() -> u64 {
    30
}

fn default_lastposition_storetime_secs() -> u64 {
    1800
}

fn default_idle_timeout_secs() -> u64 {
    48 * 3600
}

fn default_max_write_queue_bytes() -> usize {
    256 * 1024
}

fn default_max_packet_len() -> usize {
    512
}

fn default_live_upgrade_path() -> PathBuf {
    PathBuf::from("./liveupgrade.json")
}
