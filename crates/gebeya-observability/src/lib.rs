//! Observability setup for Gebeya.
//!
//! This crate provides:
//! - `LogConfig` - level, format and filter settings
//! - `init_logging` - installs the `tracing` subscriber
//! - `AUDIT_TARGET` - log target for money movements

mod logging;

pub use logging::*;
