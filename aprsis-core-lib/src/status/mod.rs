//! HTTP status surface (C10): `/status.json` and `/metrics` on the bind
//! address configured as `Config::status_listen`. Absent when that field
//! is `None` — the main binary simply doesn't spawn this listener.

mod cache;
mod document;
mod metrics;
mod server;

pub use document::{build as build_document, StatusDocument};
pub use server::{run, StatusServerError};
