//! Message types, flags and modes of the audit netlink protocol.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Largest payload the audit protocol carries after the netlink header.
pub const MAX_AUDIT_MESSAGE_LENGTH: usize = 8970;

/// Netlink protocol number of the audit family (`NETLINK_AUDIT`).
pub const NETLINK_AUDIT: i32 = 9;

/// Message type from the netlink and kernel audit namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageType(pub u16);

impl MessageType {
    /// Nothing, ignore.
    pub const NOOP: Self = Self(1);
    /// Error or acknowledgment (`struct nlmsgerr`).
    pub const ERROR: Self = Self(2);
    /// End of a multipart dump.
    pub const DONE: Self = Self(3);
    /// Data lost.
    pub const OVERRUN: Self = Self(4);

    /// Get status.
    pub const GET: Self = Self(1000);
    /// Set status (enable/disable/auditd).
    pub const SET: Self = Self(1001);
    /// Message from userspace.
    pub const USER: Self = Self(1005);
    /// Login uid change.
    pub const LOGIN: Self = Self(1006);
    /// Get info about the sender of a signal to auditd.
    pub const SIGNAL_INFO: Self = Self(1010);
    /// Add a syscall filtering rule.
    pub const ADD_RULE: Self = Self(1011);
    /// Delete a syscall filtering rule.
    pub const DEL_RULE: Self = Self(1012);
    /// List syscall filtering rules.
    pub const LIST_RULES: Self = Self(1013);
    /// Get TTY auditing status.
    pub const TTY_GET: Self = Self(1016);
    /// Set TTY auditing status.
    pub const TTY_SET: Self = Self(1017);
    /// Turn an audit feature on or off.
    pub const SET_FEATURE: Self = Self(1018);
    /// Get the currently enabled features.
    pub const GET_FEATURE: Self = Self(1019);

    /// First userspace message.
    pub const FIRST_USER_MSG: Self = Self(1100);
    /// Last userspace message.
    pub const LAST_USER_MSG: Self = Self(1199);
    /// First daemon lifecycle record.
    pub const FIRST_DAEMON: Self = Self(1200);
    /// Last daemon lifecycle record.
    pub const LAST_DAEMON: Self = Self(1299);
    /// First kernel event record (`AUDIT_SYSCALL`).
    pub const FIRST_EVENT: Self = Self(1300);
    /// Audit configuration change record, sent when the daemon pid changes.
    pub const CONFIG_CHANGE: Self = Self(1305);
    /// Last kernel event record.
    pub const LAST_EVENT: Self = Self(1999);
    /// Asynchronous audit record from the kernel.
    pub const KERNEL: Self = Self(2000);
    /// First message of the second userspace range.
    pub const FIRST_USER_MSG2: Self = Self(2100);
    /// Last message of the second userspace range.
    pub const LAST_USER_MSG2: Self = Self(2999);

    /// Raw type value.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Whether messages of this type carry a text record.
    #[must_use]
    pub fn is_text(self) -> bool {
        self == Self::USER
            || self == Self::LOGIN
            || self == Self::KERNEL
            || (Self::FIRST_USER_MSG..=Self::LAST_USER_MSG).contains(&self)
            || (Self::FIRST_DAEMON..=Self::LAST_EVENT).contains(&self)
            || (Self::FIRST_USER_MSG2..=Self::LAST_USER_MSG2).contains(&self)
    }

    /// Symbolic name for the well-known control types.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::NOOP => "NLMSG_NOOP",
            Self::ERROR => "NLMSG_ERROR",
            Self::DONE => "NLMSG_DONE",
            Self::OVERRUN => "NLMSG_OVERRUN",
            Self::GET => "AUDIT_GET",
            Self::SET => "AUDIT_SET",
            Self::USER => "AUDIT_USER",
            Self::LOGIN => "AUDIT_LOGIN",
            Self::SIGNAL_INFO => "AUDIT_SIGNAL_INFO",
            Self::ADD_RULE => "AUDIT_ADD_RULE",
            Self::DEL_RULE => "AUDIT_DEL_RULE",
            Self::LIST_RULES => "AUDIT_LIST_RULES",
            Self::TTY_GET => "AUDIT_TTY_GET",
            Self::TTY_SET => "AUDIT_TTY_SET",
            Self::SET_FEATURE => "AUDIT_SET_FEATURE",
            Self::GET_FEATURE => "AUDIT_GET_FEATURE",
            Self::CONFIG_CHANGE => "AUDIT_CONFIG_CHANGE",
            Self::KERNEL => "AUDIT_KERNEL",
            _ => return None,
        };
        Some(name)
    }
}

impl From<u16> for MessageType {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}({})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

bitflags! {
    /// Netlink header flags (`nlmsg_flags`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NetlinkFlags: u16 {
        /// Request message.
        const REQUEST = 0x01;
        /// Multipart message, terminated by `NLMSG_DONE`.
        const MULTI = 0x02;
        /// Reply with an acknowledgment, zero or an error code.
        const ACK = 0x04;
        /// Echo this request.
        const ECHO = 0x08;
    }
}

bitflags! {
    /// Fields of `struct audit_status` a `AUDIT_SET` request changes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusMask: u32 {
        /// `enabled` is valid.
        const ENABLED = 0x0001;
        /// `failure` is valid.
        const FAILURE = 0x0002;
        /// `pid` is valid.
        const PID = 0x0004;
        /// `rate_limit` is valid.
        const RATE_LIMIT = 0x0008;
        /// `backlog_limit` is valid.
        const BACKLOG_LIMIT = 0x0010;
        /// `backlog_wait_time` is valid.
        const BACKLOG_WAIT_TIME = 0x0020;
        /// `lost` is valid (reset counter).
        const LOST = 0x0040;
    }
}

/// Whether a receive may suspend the calling thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyMode {
    /// Wait until a message is queued.
    #[default]
    Blocking,
    /// Return [`AuditError::WouldBlock`](crate::AuditError::WouldBlock) when
    /// nothing is queued.
    NonBlocking,
}

/// Whether `set_pid` waits for the kernel's acknowledgment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitMode {
    /// Return once the request is sent.
    No,
    /// Wait for and check the acknowledgment.
    #[default]
    Yes,
}
