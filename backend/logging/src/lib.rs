//! Process-wide diagnostics for chanlogs.
//!
//! Installs the `tracing` subscriber (console plus an optional daily NDJSON
//! file) and scrubs credentials out of strings before they are logged.

pub mod logger;
pub mod redact;

pub use logger::init_logger;
pub use redact::redact_credentials;
