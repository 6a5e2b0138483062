//! Prelude module - commonly used types for convenient import.
//!
//! Use `use auditlink_netlink::prelude::*;` to import all essential types.

// Errors
pub use crate::{AuditError, AuditResult, ProtocolError};

// Client and transport
pub use crate::{AuditClient, Transport};
#[cfg(target_os = "linux")]
pub use crate::NetlinkSocket;

// Messages and replies
pub use crate::{AuditMessage, AuditReply, AuditStatus, ReplyPayload};

// Protocol constants and modes
pub use crate::{MAX_AUDIT_MESSAGE_LENGTH, MessageType, NetlinkFlags, ReplyMode, WaitMode};
