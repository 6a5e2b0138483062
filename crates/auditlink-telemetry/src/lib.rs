//! Auditlink Telemetry - Logging setup for the auditlink tools.
//!
//! This crate provides:
//! - Configurable logging with pretty, compact, JSON and full formats
//! - Output to stdout, stderr or rolling files
//! - Per-target directive overrides on top of a global level
//!
//! # Example
//!
//! ```rust,no_run
//! use auditlink_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), auditlink_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("auditlink_netlink=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging,
};
