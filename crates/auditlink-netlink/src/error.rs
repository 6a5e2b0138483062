//! Audit netlink error types.

use std::io;

use nix::errno::Errno;
use thiserror::Error;

use crate::types::MessageType;

/// A received frame that cannot be trusted or interpreted.
///
/// Kept apart from transport failures so callers can tell a broken socket
/// from a kernel that answered with something unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Fewer bytes arrived than a netlink header occupies.
    #[error("frame of {received} bytes is shorter than a netlink header")]
    ShortFrame {
        /// Bytes actually received.
        received: usize,
    },

    /// The header's declared length does not fit the bytes received.
    #[error("declared length {declared} does not fit the {received} bytes received")]
    LengthMismatch {
        /// Length from the header.
        declared: u32,
        /// Bytes actually received.
        received: usize,
    },

    /// The frame was larger than the receive buffer and got cut off.
    #[error("frame exceeds the {capacity} byte receive buffer")]
    Truncated {
        /// Capacity of the receive buffer.
        capacity: usize,
    },

    /// The reply did not carry a netlink source address.
    #[error("reply carried no netlink source address")]
    MissingSender,

    /// The reply came from a userspace port instead of the kernel.
    #[error("reply from netlink port {port}, expected the kernel (port 0)")]
    ForeignSender {
        /// Port the reply came from.
        port: u32,
    },

    /// An acknowledgment answered a different request.
    #[error("expected sequence number {expected}, got {actual}")]
    SequenceMismatch {
        /// Sequence number of the request.
        expected: u32,
        /// Sequence number of the reply.
        actual: u32,
    },

    /// The payload is shorter than the fixed layout of its message type.
    #[error("{kind} payload needs {needed} bytes, got {actual}")]
    ShortPayload {
        /// Name of the payload kind.
        kind: &'static str,
        /// Minimum payload length.
        needed: usize,
        /// Payload length received.
        actual: usize,
    },

    /// An `NLMSG_ERROR` carried a positive code; the kernel only sends zero
    /// or a negated errno.
    #[error("netlink error code {code} is not a negated errno")]
    InvalidErrorCode {
        /// Code as received.
        code: i32,
    },

    /// A reply of the wrong type answered a query.
    #[error("expected a {expected} reply, got {actual}")]
    UnexpectedType {
        /// Type the query expects.
        expected: MessageType,
        /// Type that arrived.
        actual: MessageType,
    },
}

impl ProtocolError {
    /// The errno this fault maps to.
    #[must_use]
    pub fn errno(&self) -> Errno {
        match self {
            Self::ShortFrame { .. } | Self::LengthMismatch { .. } => Errno::EBADE,
            Self::Truncated { .. } => Errno::EFBIG,
            Self::ForeignSender { .. } => Errno::EINVAL,
            Self::MissingSender
            | Self::SequenceMismatch { .. }
            | Self::ShortPayload { .. }
            | Self::InvalidErrorCode { .. }
            | Self::UnexpectedType { .. } => Errno::EPROTO,
        }
    }
}

/// Errors that can occur talking to the kernel audit subsystem.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The netlink socket could not be created.
    #[error("failed to open audit netlink socket: {0}")]
    Socket(#[source] io::Error),

    /// A send or receive failed at the OS level.
    #[error("netlink {op} failed: {source}")]
    Transport {
        /// The operation that failed (`"send"` or `"receive"`).
        op: &'static str,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A frame arrived but could not be used.
    #[error("audit protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The kernel answered the request with an error acknowledgment.
    #[error("kernel rejected audit request: {}", Errno::from_raw(*errno).desc())]
    Kernel {
        /// Positive errno reported by the kernel.
        errno: i32,
    },

    /// Non-blocking receive found nothing queued.
    #[error("no audit reply is queued")]
    WouldBlock,

    /// The handle was closed.
    #[error("audit socket is closed")]
    Closed,

    /// A request payload is over the audit message limit.
    #[error("audit payload of {len} bytes exceeds the {max} byte limit")]
    MessageTooLarge {
        /// Payload length requested.
        len: usize,
        /// Largest payload allowed.
        max: usize,
    },
}

impl AuditError {
    /// Negated errno for this error. Never `0`.
    ///
    /// Mirrors the `-errno` convention of the C audit library so callers can
    /// branch on a plain integer.
    #[must_use]
    pub fn code(&self) -> i32 {
        let errno = match self {
            Self::Socket(e) | Self::Transport { source: e, .. } => {
                e.raw_os_error().unwrap_or(Errno::EIO as i32)
            },
            Self::Protocol(p) => p.errno() as i32,
            Self::Kernel { errno } => *errno,
            Self::WouldBlock => Errno::EAGAIN as i32,
            Self::Closed => Errno::EBADF as i32,
            Self::MessageTooLarge { .. } => Errno::EMSGSIZE as i32,
        };
        errno.saturating_neg()
    }

    /// Whether the socket itself failed.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Socket(_) | Self::Transport { .. } | Self::Closed)
    }

    /// Whether the kernel's answer was unusable or a rejection.
    #[must_use]
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::Kernel { .. })
    }

    /// Whether this is the non-blocking "nothing yet" signal.
    #[must_use]
    pub fn is_would_block(&self) -> bool {
        matches!(self, Self::WouldBlock)
    }

    pub(crate) fn send(source: io::Error) -> Self {
        Self::Transport { op: "send", source }
    }

    pub(crate) fn receive(source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::WouldBlock {
            Self::WouldBlock
        } else {
            Self::Transport {
                op: "receive",
                source,
            }
        }
    }
}

/// Result type for audit netlink operations.
pub type AuditResult<T> = Result<T, AuditError>;
