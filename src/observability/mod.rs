//! Observability subsystem.
//!
//! Structured logging only: startup, relay failures and upgrade failures are
//! emitted as `tracing` events and written to stderr.

pub mod logging;
