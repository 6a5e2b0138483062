//! Frames as the kernel would send them.

use auditlink_netlink::{
    AuditMessage, AuditStatus, MessageType, NLMSG_ALIGNTO, NLMSG_HDRLEN, NetlinkError,
    NetlinkHeader,
};

/// Build a padded frame of type `ty` answering request `seq`.
#[must_use]
pub fn frame(ty: MessageType, seq: u32, payload: &[u8]) -> Vec<u8> {
    let len = NLMSG_HDRLEN.saturating_add(payload.len());
    let header = NetlinkHeader {
        len: u32::try_from(len).unwrap_or(u32::MAX),
        ty,
        flags: 0,
        seq,
        port_id: 0,
    };
    let mut out = header.to_bytes().to_vec();
    out.extend_from_slice(payload);
    out.resize(len.next_multiple_of(NLMSG_ALIGNTO), 0);
    out
}

/// A success acknowledgment for request `seq`.
#[must_use]
pub fn ack_frame(seq: u32) -> Vec<u8> {
    error_frame(seq, 0)
}

/// An `NLMSG_ERROR` rejecting request `seq` with positive `errno`.
#[must_use]
pub fn error_frame(seq: u32, errno: i32) -> Vec<u8> {
    let err = NetlinkError {
        error: errno.saturating_neg(),
        request: None,
    };
    frame(MessageType::ERROR, seq, &err.encode())
}

/// An acknowledgment echoing the header of `request`.
#[must_use]
pub fn ack_for(request: &AuditMessage) -> Vec<u8> {
    let err = NetlinkError {
        error: 0,
        request: Some(*request.header()),
    };
    frame(MessageType::ERROR, request.sequence(), &err.encode())
}

/// An `AUDIT_GET` reply carrying `status`.
#[must_use]
pub fn status_frame(seq: u32, status: &AuditStatus) -> Vec<u8> {
    frame(MessageType::GET, seq, &status.encode())
}

/// An `AUDIT_SIGNAL_INFO` reply with a NUL-terminated security context.
#[must_use]
pub fn signal_info_frame(seq: u32, uid: u32, pid: i32, context: &str) -> Vec<u8> {
    let mut payload = uid.to_ne_bytes().to_vec();
    payload.extend_from_slice(&pid.to_ne_bytes());
    payload.extend_from_slice(context.as_bytes());
    payload.push(0);
    frame(MessageType::SIGNAL_INFO, seq, &payload)
}

/// A text record such as an `AUDIT_USER` or kernel event line.
#[must_use]
pub fn text_frame(ty: MessageType, seq: u32, text: &str) -> Vec<u8> {
    frame(ty, seq, text.as_bytes())
}

/// A status with the daemon pid registered and auditing enabled.
#[must_use]
pub fn test_status(pid: u32) -> AuditStatus {
    AuditStatus {
        mask: 0x7f,
        enabled: 1,
        failure: 1,
        pid,
        rate_limit: 0,
        backlog_limit: 8192,
        lost: 0,
        backlog: 3,
        feature_bitmap: Some(0x7f),
        backlog_wait_time: Some(60_000),
        backlog_wait_time_actual: None,
    }
}
