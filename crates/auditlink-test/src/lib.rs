//! Auditlink Test - Shared test utilities for the auditlink crates.
//!
//! This crate provides a mock kernel that plays the audit subsystem's side
//! of the netlink conversation, and builders for the frames it sends.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! auditlink-test.workspace = true
//! ```
//!
//! Then use in your tests:
//!
//! ```rust,ignore
//! use auditlink_netlink::{AuditClient, WaitMode};
//! use auditlink_test::MockKernel;
//!
//! #[test]
//! fn test_set_pid_acknowledged() {
//!     let kernel = MockKernel::new().with_auto_ack();
//!     let mut client = AuditClient::with_transport(kernel.clone());
//!
//!     client.set_pid(1234, WaitMode::Yes).unwrap();
//!     assert_eq!(kernel.sent().len(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;

use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber with the given filter.
///
/// Safe to call from every test; only the first call installs.
pub fn setup_test_logging(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}
