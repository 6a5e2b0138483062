//! Typed views of received audit messages.
//!
//! [`AuditReply`] owns the received [`AuditMessage`]; [`AuditReply::payload`]
//! hands out a [`ReplyPayload`] that borrows from it, so no view can outlive
//! the buffer it was decoded from.

use std::borrow::Cow;

use serde::Serialize;

use crate::error::ProtocolError;
use crate::message::{AuditMessage, NLMSG_HDRLEN, NetlinkHeader, read_i32, read_u32};
use crate::types::{MessageType, StatusMask};

/// `struct audit_status`.
///
/// The first eight words are present on every kernel; the trailing ones
/// depend on the kernel version and are `None` when the reply was shorter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditStatus {
    /// Bit mask of valid entries ([`StatusMask`]).
    pub mask: u32,
    /// `1` enabled, `0` disabled, `2` locked.
    pub enabled: u32,
    /// Failure-to-log action.
    pub failure: u32,
    /// Pid of the registered audit daemon, `0` if none.
    pub pid: u32,
    /// Message rate limit (per second).
    pub rate_limit: u32,
    /// Waiting messages limit.
    pub backlog_limit: u32,
    /// Messages lost.
    pub lost: u32,
    /// Messages waiting in queue.
    pub backlog: u32,
    /// Bitmap of kernel audit features.
    pub feature_bitmap: Option<u32>,
    /// Message queue wait timeout.
    pub backlog_wait_time: Option<u32>,
    /// Time spent waiting while the message limit was exceeded.
    pub backlog_wait_time_actual: Option<u32>,
}

impl AuditStatus {
    /// Bytes every kernel sends.
    pub const MIN_LEN: usize = 32;

    /// Bytes written by [`encode`](Self::encode).
    pub const ENCODED_LEN: usize = 40;

    /// A request that registers `pid` as the audit event receiver.
    #[must_use]
    pub fn set_pid(pid: u32) -> Self {
        Self {
            mask: StatusMask::PID.bits(),
            pid,
            ..Self::default()
        }
    }

    /// The `mask` word as flags.
    #[must_use]
    pub fn status_mask(&self) -> StatusMask {
        StatusMask::from_bits_truncate(self.mask)
    }

    /// Whether auditing is on (enabled or locked).
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled != 0
    }

    /// Whether the configuration is locked until reboot.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.enabled == 2
    }

    /// Encode as a request payload, optional words written as zero.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let words = [
            self.mask,
            self.enabled,
            self.failure,
            self.pid,
            self.rate_limit,
            self.backlog_limit,
            self.lost,
            self.backlog,
            self.feature_bitmap.unwrap_or(0),
            self.backlog_wait_time.unwrap_or(0),
        ];
        words.iter().flat_map(|w| w.to_ne_bytes()).collect()
    }

    /// Decode a status payload.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ShortPayload`] if fewer than
    /// [`MIN_LEN`](Self::MIN_LEN) bytes are given.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let word = |index: usize| read_u32(bytes, index.saturating_mul(4));
        let short = ProtocolError::ShortPayload {
            kind: "audit_status",
            needed: Self::MIN_LEN,
            actual: bytes.len(),
        };
        if bytes.len() < Self::MIN_LEN {
            return Err(short);
        }
        Ok(Self {
            mask: word(0).ok_or(short.clone())?,
            enabled: word(1).ok_or(short.clone())?,
            failure: word(2).ok_or(short.clone())?,
            pid: word(3).ok_or(short.clone())?,
            rate_limit: word(4).ok_or(short.clone())?,
            backlog_limit: word(5).ok_or(short.clone())?,
            lost: word(6).ok_or(short.clone())?,
            backlog: word(7).ok_or(short)?,
            feature_bitmap: word(8),
            backlog_wait_time: word(9),
            backlog_wait_time_actual: word(10),
        })
    }
}

/// `struct nlmsgerr`: an error code plus the header of the offending request.
///
/// An error code of zero is a plain acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetlinkError {
    /// Zero for an acknowledgment, otherwise a negated errno.
    pub error: i32,
    /// Header of the request being answered, when the kernel included it.
    pub request: Option<NetlinkHeader>,
}

impl NetlinkError {
    /// Bytes needed for the error code.
    pub const MIN_LEN: usize = 4;

    /// Whether this is a success acknowledgment.
    #[must_use]
    pub fn is_ack(&self) -> bool {
        self.error == 0
    }

    /// Positive errno for a failure, `None` for an acknowledgment.
    #[must_use]
    pub fn errno(&self) -> Option<i32> {
        (self.error != 0).then(|| self.error.saturating_neg())
    }

    /// Encode as an `NLMSG_ERROR` payload.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.error.to_ne_bytes().to_vec();
        if let Some(request) = &self.request {
            out.extend_from_slice(&request.to_bytes());
        }
        out
    }

    /// Decode an `NLMSG_ERROR` payload.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ShortPayload`] if the error code is missing
    /// and [`ProtocolError::InvalidErrorCode`] if it is positive.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let error = read_i32(bytes, 0).ok_or(ProtocolError::ShortPayload {
            kind: "nlmsgerr",
            needed: Self::MIN_LEN,
            actual: bytes.len(),
        })?;
        if error > 0 {
            return Err(ProtocolError::InvalidErrorCode { code: error });
        }
        let request = bytes
            .get(Self::MIN_LEN..)
            .filter(|rest| rest.len() >= NLMSG_HDRLEN)
            .and_then(|rest| NetlinkHeader::from_bytes(rest).ok());
        Ok(Self { error, request })
    }
}

/// `struct audit_sig_info`: who last signalled the audit daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalInfo<'a> {
    /// Login uid of the sender.
    pub uid: u32,
    /// Pid of the sender.
    pub pid: i32,
    context: &'a [u8],
}

impl<'a> SignalInfo<'a> {
    /// Bytes taken by `uid` and `pid`.
    pub const MIN_LEN: usize = 8;

    /// Decode a signal info payload.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ShortPayload`] if `uid` or `pid` is missing.
    pub fn decode(bytes: &'a [u8]) -> Result<Self, ProtocolError> {
        let short = || ProtocolError::ShortPayload {
            kind: "audit_sig_info",
            needed: Self::MIN_LEN,
            actual: bytes.len(),
        };
        let uid = read_u32(bytes, 0).ok_or_else(short)?;
        let pid = read_i32(bytes, 4).ok_or_else(short)?;
        let context = bytes.get(Self::MIN_LEN..).map_or(&[][..], trim_nul);
        Ok(Self { uid, pid, context })
    }

    /// Security context of the sender, `None` when the kernel sent none.
    #[must_use]
    pub fn context(&self) -> Option<Cow<'a, str>> {
        (!self.context.is_empty()).then(|| String::from_utf8_lossy(self.context))
    }

    /// Raw context bytes without the NUL terminator.
    #[must_use]
    pub fn context_bytes(&self) -> &'a [u8] {
        self.context
    }
}

/// A text record, such as an event line or a userspace message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditText<'a>(&'a [u8]);

impl<'a> AuditText<'a> {
    /// Text bytes without trailing NULs.
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.0
    }

    /// The text, with invalid UTF-8 replaced.
    #[must_use]
    pub fn to_str_lossy(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.0)
    }
}

/// `struct audit_rule_data`, carried opaque.
///
/// Only the leading words are exposed; rule fields are not interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleData<'a>(&'a [u8]);

impl<'a> RuleData<'a> {
    /// Bytes taken by `flags`, `action` and `field_count`.
    pub const MIN_LEN: usize = 12;

    /// Filter list the rule belongs to.
    #[must_use]
    pub fn flags(&self) -> u32 {
        read_u32(self.0, 0).unwrap_or_default()
    }

    /// Rule action.
    #[must_use]
    pub fn action(&self) -> u32 {
        read_u32(self.0, 4).unwrap_or_default()
    }

    /// Number of rule fields.
    #[must_use]
    pub fn field_count(&self) -> u32 {
        read_u32(self.0, 8).unwrap_or_default()
    }

    /// The full rule payload.
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.0
    }
}

/// Interpretation of a reply, selected by its message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyPayload<'a> {
    /// `AUDIT_GET` status report.
    Status(AuditStatus),
    /// `AUDIT_LIST_RULES` rule record.
    RuleData(RuleData<'a>),
    /// Text record.
    Text(AuditText<'a>),
    /// `NLMSG_ERROR` error or acknowledgment.
    Error(NetlinkError),
    /// `AUDIT_SIGNAL_INFO` sender credentials.
    SignalInfo(SignalInfo<'a>),
    /// Any other type; use [`AuditReply::message`] for the raw bytes.
    Unknown,
}

impl<'a> ReplyPayload<'a> {
    /// Interpret `payload` according to `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ShortPayload`] when a known type's payload is
    /// too short for its fixed layout.
    pub fn parse(ty: MessageType, payload: &'a [u8]) -> Result<Self, ProtocolError> {
        let parsed = match ty {
            MessageType::ERROR => Self::Error(NetlinkError::decode(payload)?),
            MessageType::GET => Self::Status(AuditStatus::decode(payload)?),
            MessageType::SIGNAL_INFO => Self::SignalInfo(SignalInfo::decode(payload)?),
            MessageType::LIST_RULES => {
                if payload.len() < RuleData::MIN_LEN {
                    return Err(ProtocolError::ShortPayload {
                        kind: "audit_rule_data",
                        needed: RuleData::MIN_LEN,
                        actual: payload.len(),
                    });
                }
                Self::RuleData(RuleData(payload))
            },
            ty if ty.is_text() => Self::Text(AuditText(trim_nul(payload))),
            _ => Self::Unknown,
        };
        Ok(parsed)
    }
}

/// One message received from the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditReply {
    message: AuditMessage,
}

impl AuditReply {
    /// Wrap a received message after checking its payload fits its type.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ShortPayload`] when the payload is too short
    /// for the layout its type implies.
    pub fn from_message(message: AuditMessage) -> Result<Self, ProtocolError> {
        ReplyPayload::parse(message.message_type(), message.payload())?;
        Ok(Self { message })
    }

    /// Message type reported by the kernel.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        self.message.message_type()
    }

    /// Length declared in the netlink header.
    #[must_use]
    pub fn len(&self) -> usize {
        self.message.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.message.is_empty()
    }

    /// Sequence number of the reply.
    #[must_use]
    pub fn sequence(&self) -> u32 {
        self.message.sequence()
    }

    /// Raw header.
    #[must_use]
    pub fn header(&self) -> &NetlinkHeader {
        self.message.header()
    }

    /// The underlying message.
    #[must_use]
    pub fn message(&self) -> &AuditMessage {
        &self.message
    }

    /// Give back the underlying message.
    #[must_use]
    pub fn into_message(self) -> AuditMessage {
        self.message
    }

    /// Typed view of the payload.
    #[must_use]
    pub fn payload(&self) -> ReplyPayload<'_> {
        // Validated in `from_message`.
        ReplyPayload::parse(self.message.message_type(), self.message.payload())
            .unwrap_or(ReplyPayload::Unknown)
    }
}

fn trim_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    bytes.get(..end).unwrap_or(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NetlinkFlags;

    fn reply(ty: MessageType, payload: Vec<u8>) -> Result<AuditReply, ProtocolError> {
        let msg = AuditMessage::new(ty, NetlinkFlags::empty(), payload).unwrap();
        AuditReply::from_message(msg)
    }

    #[test]
    fn test_status_reply() {
        let status = AuditStatus {
            enabled: 1,
            pid: 321,
            backlog_limit: 8192,
            ..AuditStatus::default()
        };
        let reply = reply(MessageType::GET, status.encode()).unwrap();

        let ReplyPayload::Status(decoded) = reply.payload() else {
            panic!("expected status payload");
        };
        assert_eq!(decoded.pid, 321);
        assert_eq!(decoded.backlog_limit, 8192);
        assert!(decoded.is_enabled());
        assert!(!decoded.is_locked());
        assert_eq!(decoded.feature_bitmap, Some(0));
        assert_eq!(decoded.backlog_wait_time_actual, None);
    }

    #[test]
    fn test_status_old_kernel_layout() {
        let bytes = AuditStatus::default().encode();
        let decoded = AuditStatus::decode(&bytes[..AuditStatus::MIN_LEN]).unwrap();
        assert_eq!(decoded.feature_bitmap, None);
        assert_eq!(decoded.backlog_wait_time, None);
    }

    #[test]
    fn test_status_too_short() {
        let result = reply(MessageType::GET, vec![0u8; 20]);
        assert_eq!(
            result,
            Err(ProtocolError::ShortPayload {
                kind: "audit_status",
                needed: 32,
                actual: 20
            })
        );
    }

    #[test]
    fn test_set_pid_request_payload() {
        let status = AuditStatus::set_pid(1234);
        assert_eq!(status.status_mask(), StatusMask::PID);
        let bytes = status.encode();
        assert_eq!(bytes.len(), AuditStatus::ENCODED_LEN);
        assert_eq!(read_u32(&bytes, 0), Some(4));
        assert_eq!(read_u32(&bytes, 12), Some(1234));
    }

    #[test]
    fn test_error_reply() {
        let request = NetlinkHeader {
            len: 56,
            ty: MessageType::SET,
            flags: 5,
            seq: 9,
            port_id: 0,
        };
        let err = NetlinkError {
            error: -1,
            request: Some(request),
        };
        let reply = reply(MessageType::ERROR, err.encode()).unwrap();
        let ReplyPayload::Error(decoded) = reply.payload() else {
            panic!("expected error payload");
        };
        assert!(!decoded.is_ack());
        assert_eq!(decoded.errno(), Some(1));
        assert_eq!(decoded.request.map(|h| h.seq), Some(9));
    }

    #[test]
    fn test_positive_error_code_rejected() {
        let result = reply(MessageType::ERROR, 13i32.to_ne_bytes().to_vec());
        assert_eq!(result, Err(ProtocolError::InvalidErrorCode { code: 13 }));
    }

    #[test]
    fn test_ack_reply_without_request_header() {
        let reply = reply(MessageType::ERROR, 0i32.to_ne_bytes().to_vec()).unwrap();
        let ReplyPayload::Error(decoded) = reply.payload() else {
            panic!("expected error payload");
        };
        assert!(decoded.is_ack());
        assert_eq!(decoded.errno(), None);
        assert_eq!(decoded.request, None);
    }

    #[test]
    fn test_signal_info_with_context() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1000u32.to_ne_bytes());
        payload.extend_from_slice(&42i32.to_ne_bytes());
        payload.extend_from_slice(b"u:r:init:s0\0");
        let reply = reply(MessageType::SIGNAL_INFO, payload).unwrap();

        let ReplyPayload::SignalInfo(info) = reply.payload() else {
            panic!("expected signal info payload");
        };
        assert_eq!(info.uid, 1000);
        assert_eq!(info.pid, 42);
        assert_eq!(info.context().as_deref(), Some("u:r:init:s0"));
    }

    #[test]
    fn test_signal_info_without_context() {
        let mut payload = 0u32.to_ne_bytes().to_vec();
        payload.extend_from_slice(&1i32.to_ne_bytes());
        let info = SignalInfo::decode(&payload).unwrap();
        assert_eq!(info.context(), None);
        assert!(info.context_bytes().is_empty());
    }

    #[test]
    fn test_text_reply_trims_nul() {
        let reply = reply(MessageType(1300), b"arch=c000003e syscall=59\0\0".to_vec()).unwrap();
        let ReplyPayload::Text(text) = reply.payload() else {
            panic!("expected text payload");
        };
        assert_eq!(text.to_str_lossy(), "arch=c000003e syscall=59");
    }

    #[test]
    fn test_rule_data_exposes_header_words() {
        let mut payload = Vec::new();
        for word in [4u32, 2, 3] {
            payload.extend_from_slice(&word.to_ne_bytes());
        }
        payload.extend_from_slice(&[0u8; 64]);
        let reply = reply(MessageType::LIST_RULES, payload).unwrap();
        let ReplyPayload::RuleData(rule) = reply.payload() else {
            panic!("expected rule data payload");
        };
        assert_eq!(rule.flags(), 4);
        assert_eq!(rule.action(), 2);
        assert_eq!(rule.field_count(), 3);
        assert_eq!(rule.as_bytes().len(), 76);
    }

    #[test]
    fn test_unknown_type_keeps_raw_bytes() {
        let reply = reply(MessageType(3500), vec![1, 2, 3]).unwrap();
        assert_eq!(reply.payload(), ReplyPayload::Unknown);
        assert_eq!(reply.message().payload(), &[1, 2, 3]);
        assert_eq!(reply.len(), 19);
    }

    #[test]
    fn test_status_serializes() {
        let json = serde_json::to_value(AuditStatus::set_pid(5)).unwrap();
        assert_eq!(json["pid"], 5);
        assert_eq!(json["mask"], 4);
    }
}
