//! Auditlink Netlink - A client for the Linux kernel audit subsystem.
//!
//! This crate provides:
//! - An owned `NETLINK_AUDIT` socket, released on close or drop
//! - Netlink framing with the kernel's 8970 byte audit payload limit
//! - Reply retrieval, blocking or non-blocking, with optional peek
//! - Typed reply payloads selected by message type
//! - The `AUDIT_SET` pid registration and `AUDIT_GET` status query
//!
//! # Error Model
//!
//! Every failure is returned to the caller; nothing is retried. Transport
//! failures (the socket is broken), protocol failures (the kernel's answer
//! is unusable or a rejection) and the non-blocking "nothing queued" signal
//! are distinct [`AuditError`] variants, and [`AuditError::code`] gives the
//! negated errno for callers that want a plain integer.
//!
//! # Example
//!
//! ```rust,no_run
//! use auditlink_netlink::{AuditClient, ReplyMode, ReplyPayload, WaitMode};
//!
//! # fn main() -> auditlink_netlink::AuditResult<()> {
//! let mut client = AuditClient::open()?;
//! client.set_pid(std::process::id(), WaitMode::Yes)?;
//!
//! let reply = client.get_reply(ReplyMode::Blocking, false)?;
//! if let ReplyPayload::Text(text) = reply.payload() {
//!     println!("{}: {}", reply.message_type(), text.to_str_lossy());
//! }
//!
//! client.close();
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

mod client;
mod error;
mod message;
mod reply;
#[cfg(target_os = "linux")]
mod socket;
mod transport;
mod types;

pub use client::AuditClient;
pub use error::{AuditError, AuditResult, ProtocolError};
pub use message::{AuditMessage, MAX_FRAME_LENGTH, NLMSG_ALIGNTO, NLMSG_HDRLEN, NetlinkHeader};
pub use reply::{
    AuditReply, AuditStatus, AuditText, NetlinkError, ReplyPayload, RuleData, SignalInfo,
};
#[cfg(target_os = "linux")]
pub use socket::NetlinkSocket;
pub use transport::{Datagram, RecvFlags, Transport};
pub use types::{
    MAX_AUDIT_MESSAGE_LENGTH, MessageType, NETLINK_AUDIT, NetlinkFlags, ReplyMode, StatusMask,
    WaitMode,
};
