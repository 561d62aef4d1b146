use serde::Deserialize;

/// Structured logging configuration (mirrors the teacher's
/// `telemetry::LoggingConfig`): a `tracing-subscriber` filter directive
/// plus a flag selecting compact vs. JSON formatting.
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Filter directive string, as accepted by `tracing_subscriber::EnvFilter`.
    /// Overridable at runtime via the `RUST_LOG` environment variable.
    /// Default: "info"
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit structured JSON log lines instead of the compact human format.
    /// Default: false
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { level: default_level(), json: false }
    }
}

fn default_level() -> String {
    "info".to_string()
}
