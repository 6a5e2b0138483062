//! Netlink framing for audit messages.
//!
//! A frame is a 16 byte `nlmsghdr` in host byte order followed by at most
//! [`MAX_AUDIT_MESSAGE_LENGTH`] payload bytes. Outbound frames are padded to
//! the 4 byte netlink alignment; the header length never counts the padding.

use serde::Serialize;

use crate::error::{AuditError, AuditResult, ProtocolError};
use crate::types::{MAX_AUDIT_MESSAGE_LENGTH, MessageType, NetlinkFlags};

/// Size of `struct nlmsghdr`.
pub const NLMSG_HDRLEN: usize = 16;

/// Netlink message alignment.
pub const NLMSG_ALIGNTO: usize = 4;

/// Largest frame the audit protocol produces: header plus full payload.
pub const MAX_FRAME_LENGTH: usize = NLMSG_HDRLEN + MAX_AUDIT_MESSAGE_LENGTH;

/// Read a host-order `u32` at `offset`, `None` when out of bounds.
pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    let word: [u8; 4] = bytes.get(offset..end)?.try_into().ok()?;
    Some(u32::from_ne_bytes(word))
}

/// Read a host-order `i32` at `offset`, `None` when out of bounds.
pub(crate) fn read_i32(bytes: &[u8], offset: usize) -> Option<i32> {
    let end = offset.checked_add(4)?;
    let word: [u8; 4] = bytes.get(offset..end)?.try_into().ok()?;
    Some(i32::from_ne_bytes(word))
}

fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let end = offset.checked_add(2)?;
    let word: [u8; 2] = bytes.get(offset..end)?.try_into().ok()?;
    Some(u16::from_ne_bytes(word))
}

/// `struct nlmsghdr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetlinkHeader {
    /// Length of header plus payload.
    pub len: u32,
    /// Message type.
    pub ty: MessageType,
    /// Raw `nlmsg_flags`.
    pub flags: u16,
    /// Sequence number.
    pub seq: u32,
    /// Sending port id, `0` for the kernel.
    pub port_id: u32,
}

impl NetlinkHeader {
    /// Flags known to this crate; unknown bits are dropped.
    #[must_use]
    pub fn netlink_flags(&self) -> NetlinkFlags {
        NetlinkFlags::from_bits_truncate(self.flags)
    }

    /// Encode to the 16 byte wire layout.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; NLMSG_HDRLEN] {
        let mut out = [0u8; NLMSG_HDRLEN];
        out[0..4].copy_from_slice(&self.len.to_ne_bytes());
        out[4..6].copy_from_slice(&self.ty.0.to_ne_bytes());
        out[6..8].copy_from_slice(&self.flags.to_ne_bytes());
        out[8..12].copy_from_slice(&self.seq.to_ne_bytes());
        out[12..16].copy_from_slice(&self.port_id.to_ne_bytes());
        out
    }

    /// Decode the leading 16 bytes of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ShortFrame`] if fewer than 16 bytes are given.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let short = || ProtocolError::ShortFrame {
            received: bytes.len(),
        };
        Ok(Self {
            len: read_u32(bytes, 0).ok_or_else(short)?,
            ty: MessageType(read_u16(bytes, 4).ok_or_else(short)?),
            flags: read_u16(bytes, 6).ok_or_else(short)?,
            seq: read_u32(bytes, 8).ok_or_else(short)?,
            port_id: read_u32(bytes, 12).ok_or_else(short)?,
        })
    }
}

/// A netlink header plus an owned payload of bounded size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditMessage {
    header: NetlinkHeader,
    payload: Vec<u8>,
}

impl AuditMessage {
    /// Build an outbound message with sequence number and port id zero.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::MessageTooLarge`] when `payload` is longer than
    /// [`MAX_AUDIT_MESSAGE_LENGTH`]; nothing is ever truncated.
    pub fn new(
        ty: MessageType,
        flags: NetlinkFlags,
        payload: impl Into<Vec<u8>>,
    ) -> AuditResult<Self> {
        let payload = payload.into();
        if payload.len() > MAX_AUDIT_MESSAGE_LENGTH {
            return Err(AuditError::MessageTooLarge {
                len: payload.len(),
                max: MAX_AUDIT_MESSAGE_LENGTH,
            });
        }
        // Bounded by MAX_FRAME_LENGTH, fits u32.
        let len = u32::try_from(NLMSG_HDRLEN.saturating_add(payload.len())).unwrap_or(u32::MAX);
        Ok(Self {
            header: NetlinkHeader {
                len,
                ty,
                flags: flags.bits(),
                seq: 0,
                port_id: 0,
            },
            payload,
        })
    }

    /// Set the sequence number.
    #[must_use]
    pub fn with_sequence(mut self, seq: u32) -> Self {
        self.header.seq = seq;
        self
    }

    /// Set the sender port id.
    #[must_use]
    pub fn with_port_id(mut self, port_id: u32) -> Self {
        self.header.port_id = port_id;
        self
    }

    /// The netlink header.
    #[must_use]
    pub fn header(&self) -> &NetlinkHeader {
        &self.header
    }

    /// Message type from the header.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        self.header.ty
    }

    /// Sequence number from the header.
    #[must_use]
    pub fn sequence(&self) -> u32 {
        self.header.seq
    }

    /// Total length (header plus payload) as declared on the wire.
    #[must_use]
    pub fn len(&self) -> usize {
        NLMSG_HDRLEN.saturating_add(self.payload.len())
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Payload bytes after the header.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Encode header and payload, zero padded to the netlink alignment.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let padded = self.len().next_multiple_of(NLMSG_ALIGNTO);
        let mut frame = Vec::with_capacity(padded);
        frame.extend_from_slice(&self.header.to_bytes());
        frame.extend_from_slice(&self.payload);
        frame.resize(padded, 0);
        frame
    }

    /// Decode one frame, ignoring alignment padding after the declared length.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] when the frame is shorter than a header,
    /// declares a length outside `16..=frame.len()`, or carries a payload over
    /// [`MAX_AUDIT_MESSAGE_LENGTH`].
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let header = NetlinkHeader::from_bytes(frame)?;
        let declared = usize::try_from(header.len).unwrap_or(usize::MAX);
        if declared < NLMSG_HDRLEN || declared > frame.len() {
            return Err(ProtocolError::LengthMismatch {
                declared: header.len,
                received: frame.len(),
            });
        }
        let payload = frame
            .get(NLMSG_HDRLEN..declared)
            .ok_or(ProtocolError::LengthMismatch {
                declared: header.len,
                received: frame.len(),
            })?;
        if payload.len() > MAX_AUDIT_MESSAGE_LENGTH {
            return Err(ProtocolError::Truncated {
                capacity: MAX_FRAME_LENGTH,
            });
        }
        Ok(Self {
            header,
            payload: payload.to_vec(),
        })
    }
}
