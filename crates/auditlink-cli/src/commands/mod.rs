//! CLI subcommand implementations.
//!
//! Netlink commands are generic over the transport and return their
//! rendered output, so they run against a mock kernel in tests.

pub(crate) mod config;
pub(crate) mod recv;
pub(crate) mod set_pid;
pub(crate) mod status;
