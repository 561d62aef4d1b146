use thiserror::Error;

/// Top-level errors that can occur while configuring or running the core.
///
/// Per-packet parse failures are not represented here — they are counted
/// through [`crate::diagnostics::RxErrCounters`] instead, since a malformed
/// packet must never tear down a connection (see [`crate::parser::ParseError`]).
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("live-upgrade handoff error: {0}")]
    LiveUpgrade(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
