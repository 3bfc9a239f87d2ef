//! Chronicle Infrastructure Library
//!
//! Shared infrastructure used by Chronicle processes. Currently this is the
//! tracing subscriber setup.

pub mod telemetry;

pub use telemetry::{init_telemetry, shutdown_telemetry, LogFormat, TelemetryConfig};
