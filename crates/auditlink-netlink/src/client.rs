//! The audit netlink client.

use std::collections::VecDeque;

use tracing::{debug, error, warn};

use crate::error::{AuditError, AuditResult, ProtocolError};
use crate::message::{AuditMessage, MAX_FRAME_LENGTH};
use crate::reply::{AuditReply, AuditStatus, ReplyPayload};
use crate::transport::{RecvFlags, Transport};
use crate::types::{MessageType, NetlinkFlags, ReplyMode, WaitMode};

#[cfg(target_os = "linux")]
use crate::socket::NetlinkSocket;

/// Sequence numbers stay in the positive `i16` range and restart at 1.
const MAX_SEQUENCE: u32 = i16::MAX as u32;

/// A handle to the kernel audit subsystem.
///
/// Every operation takes `&mut self`: one handle serves one thread at a time.
/// Share it behind a `Mutex` if several threads need it. Nothing is retried;
/// every failure goes back to the caller.
///
/// Kernel records that arrive while [`set_pid`](Self::set_pid) waits for its
/// acknowledgment are held back and handed out by the next
/// [`get_reply`](Self::get_reply) calls, oldest first.
#[derive(Debug)]
pub struct AuditClient<T: Transport> {
    transport: T,
    sequence: u32,
    recv_buf: Vec<u8>,
    deferred: VecDeque<AuditReply>,
}

#[cfg(target_os = "linux")]
impl AuditClient<NetlinkSocket> {
    /// Open a netlink socket on the audit protocol.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Socket`] with the `socket(2)` error.
    pub fn open() -> AuditResult<Self> {
        let socket = NetlinkSocket::open().map_err(|e| {
            error!(error = %e, "could not open audit netlink socket");
            AuditError::Socket(e)
        })?;
        Ok(Self::with_transport(socket))
    }
}

impl<T: Transport> AuditClient<T> {
    /// Drive the client over an existing transport.
    #[must_use]
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            sequence: 0,
            recv_buf: vec![0u8; MAX_FRAME_LENGTH],
            deferred: VecDeque::new(),
        }
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Sequence number of the last request sent, `0` before the first.
    #[must_use]
    pub fn last_sequence(&self) -> u32 {
        self.sequence
    }

    /// Release the socket. Later operations fail with [`AuditError::Closed`].
    pub fn close(&mut self) {
        self.transport.close();
    }

    /// Records received while waiting for an acknowledgment and not yet
    /// returned by [`get_reply`](Self::get_reply).
    #[must_use]
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Whether [`close`](Self::close) was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }

    fn ensure_open(&self) -> AuditResult<()> {
        if self.transport.is_closed() {
            Err(AuditError::Closed)
        } else {
            Ok(())
        }
    }

    fn next_sequence(&mut self) -> u32 {
        self.sequence = self
            .sequence
            .checked_add(1)
            .filter(|seq| *seq <= MAX_SEQUENCE)
            .unwrap_or(1);
        self.sequence
    }

    /// Frame `payload` as a `ty` request and send it.
    ///
    /// `NLM_F_REQUEST` is always set. Returns the sequence number assigned
    /// to the request.
    ///
    /// # Errors
    ///
    /// - [`AuditError::MessageTooLarge`] before anything is sent
    /// - [`AuditError::Closed`] after [`close`](Self::close)
    /// - [`AuditError::Transport`] if the send fails or writes a partial frame
    pub fn send(
        &mut self,
        ty: MessageType,
        payload: &[u8],
        flags: NetlinkFlags,
    ) -> AuditResult<u32> {
        self.ensure_open()?;
        let message = AuditMessage::new(ty, flags | NetlinkFlags::REQUEST, payload)?;
        let seq = self.next_sequence();
        let frame = message.with_sequence(seq).encode();

        debug!(%ty, seq, len = frame.len(), "sending audit request");
        let written = self.transport.send(&frame).map_err(|e| {
            error!(%ty, seq, error = %e, "audit request send failed");
            AuditError::send(e)
        })?;
        if written != frame.len() {
            error!(%ty, seq, written, expected = frame.len(), "short audit request send");
            return Err(AuditError::send(std::io::Error::other(format!(
                "wrote {written} of {} bytes",
                frame.len()
            ))));
        }
        Ok(seq)
    }

    /// Receive one message.
    ///
    /// With [`ReplyMode::Blocking`] this waits indefinitely; with
    /// [`ReplyMode::NonBlocking`] it fails with [`AuditError::WouldBlock`] if
    /// nothing is queued. With `peek` the message stays queued and the next
    /// call sees it again. Records held back by [`set_pid`](Self::set_pid)
    /// come first.
    ///
    /// # Errors
    ///
    /// - [`AuditError::WouldBlock`] when non-blocking and the queue is empty
    /// - [`AuditError::Closed`] after [`close`](Self::close)
    /// - [`AuditError::Transport`] for OS receive errors
    /// - [`AuditError::Protocol`] for truncated or malformed frames, replies
    ///   not sent by the kernel, and payloads too short for their type
    pub fn get_reply(&mut self, mode: ReplyMode, peek: bool) -> AuditResult<AuditReply> {
        self.ensure_open()?;
        let held = if peek {
            self.deferred.front().cloned()
        } else {
            self.deferred.pop_front()
        };
        match held {
            Some(reply) => Ok(reply),
            None => self.receive(mode, peek),
        }
    }

    /// Read one message from the transport.
    fn receive(&mut self, mode: ReplyMode, peek: bool) -> AuditResult<AuditReply> {
        let flags = RecvFlags {
            peek,
            nonblocking: mode == ReplyMode::NonBlocking,
        };

        let datagram = self
            .transport
            .recv(&mut self.recv_buf, flags)
            .map_err(AuditError::receive)
            .inspect_err(|e| {
                if !e.is_would_block() {
                    error!(error = %e, "audit reply receive failed");
                }
            })?;

        let capacity = self.recv_buf.len();
        if datagram.truncated || datagram.len > capacity {
            error!(len = datagram.len, capacity, "audit reply truncated");
            return Err(ProtocolError::Truncated { capacity }.into());
        }

        match datagram.sender {
            Some(0) => {},
            Some(port) => {
                error!(port, "audit reply not sent by the kernel");
                return Err(ProtocolError::ForeignSender { port }.into());
            },
            None => {
                error!("audit reply carried no sender address");
                return Err(ProtocolError::MissingSender.into());
            },
        }

        let frame = self.recv_buf.get(..datagram.len).unwrap_or_default();
        let message = AuditMessage::decode(frame).map_err(|e| {
            // A frame that filled the whole buffer was most likely cut short.
            let e = if datagram.len == capacity {
                ProtocolError::Truncated { capacity }
            } else {
                e
            };
            error!(error = %e, "bad kernel response");
            e
        })?;

        let reply = AuditReply::from_message(message)?;
        debug!(
            ty = %reply.message_type(),
            seq = reply.sequence(),
            len = reply.len(),
            peek,
            "received audit reply"
        );
        Ok(reply)
    }

    /// Register `pid` as the receiver of audit events.
    ///
    /// With [`WaitMode::Yes`] the request asks for an acknowledgment and the
    /// call waits for it: an error acknowledgment fails the call with
    /// [`AuditError::Kernel`], and an acknowledgment of a different sequence
    /// number fails with [`ProtocolError::SequenceMismatch`]. Audit records
    /// the kernel sends before the acknowledgment are kept for
    /// [`get_reply`](Self::get_reply). With [`WaitMode::No`] the call returns
    /// once the request is sent.
    ///
    /// # Errors
    ///
    /// Send failures, and with [`WaitMode::Yes`] any error of
    /// [`get_reply`](Self::get_reply) or a kernel rejection.
    pub fn set_pid(&mut self, pid: u32, wait: WaitMode) -> AuditResult<()> {
        let flags = match wait {
            WaitMode::Yes => NetlinkFlags::ACK,
            WaitMode::No => NetlinkFlags::empty(),
        };
        let payload = AuditStatus::set_pid(pid).encode();
        let seq = self
            .send(MessageType::SET, &payload, flags)
            .inspect_err(|e| error!(pid, error = %e, "could not set audit pid"))?;

        if wait == WaitMode::Yes {
            self.await_ack(seq)
                .inspect_err(|e| error!(pid, error = %e, "audit pid not acknowledged"))?;
        }
        debug!(pid, seq, "audit pid set");
        Ok(())
    }

    /// Wait for the acknowledgment of request `seq`, consuming it.
    ///
    /// The acknowledgment is an `NLMSG_ERROR` or a status reply carrying
    /// `seq`. Anything else the kernel sends first is deferred.
    fn await_ack(&mut self, seq: u32) -> AuditResult<()> {
        loop {
            let reply = self.receive(ReplyMode::Blocking, false)?;
            let outcome: Option<AuditResult<()>> = match reply.payload() {
                ReplyPayload::Error(err) if reply.sequence() == seq => Some(match err.errno() {
                    Some(errno) => Err(AuditError::Kernel { errno }),
                    None => Ok(()),
                }),
                ReplyPayload::Error(_) => {
                    warn!(
                        expected = seq,
                        actual = reply.sequence(),
                        "acknowledgment for another request"
                    );
                    Some(Err(ProtocolError::SequenceMismatch {
                        expected: seq,
                        actual: reply.sequence(),
                    }
                    .into()))
                },
                ReplyPayload::Status(_) if reply.sequence() == seq => Some(Ok(())),
                _ => None,
            };

            match outcome {
                Some(result) => return result,
                None => {
                    debug!(
                        ty = %reply.message_type(),
                        seq = reply.sequence(),
                        "deferring record received before acknowledgment"
                    );
                    self.deferred.push_back(reply);
                },
            }
        }
    }

    /// Query the kernel's audit status.
    ///
    /// Kernel records that are not addressed to the query are deferred, as
    /// in [`set_pid`](Self::set_pid).
    ///
    /// # Errors
    ///
    /// Send and receive failures, [`AuditError::Kernel`] if the kernel
    /// answers with an error, [`ProtocolError::UnexpectedType`] for any other
    /// kind of reply to the query and [`ProtocolError::SequenceMismatch`] for
    /// a status answering another request.
    pub fn get_status(&mut self, mode: ReplyMode) -> AuditResult<AuditStatus> {
        let seq = self.send(MessageType::GET, &[], NetlinkFlags::empty())?;
        loop {
            let reply = self.receive(mode, false)?;
            let outcome: Option<AuditResult<AuditStatus>> = match reply.payload() {
                ReplyPayload::Status(status) if reply.sequence() == seq => Some(Ok(status)),
                ReplyPayload::Status(_) => Some(Err(ProtocolError::SequenceMismatch {
                    expected: seq,
                    actual: reply.sequence(),
                }
                .into())),
                ReplyPayload::Error(err) if !err.is_ack() => Some(Err(AuditError::Kernel {
                    errno: err.errno().unwrap_or(0),
                })),
                _ if reply.sequence() == seq => Some(Err(ProtocolError::UnexpectedType {
                    expected: MessageType::GET,
                    actual: reply.message_type(),
                }
                .into())),
                _ => None,
            };

            match outcome {
                Some(result) => return result,
                None => {
                    debug!(
                        ty = %reply.message_type(),
                        seq = reply.sequence(),
                        "deferring record received before status"
                    );
                    self.deferred.push_back(reply);
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;

    use super::*;
    use crate::reply::NetlinkError;
    use crate::transport::Datagram;

    /// Replays canned frames in order; records sent frames.
    #[derive(Default)]
    struct Scripted {
        replies: VecDeque<(Vec<u8>, u32)>,
        sent: Vec<Vec<u8>>,
        short_write: bool,
        closed: bool,
    }

    impl Transport for Scripted {
        fn send(&mut self, frame: &[u8]) -> io::Result<usize> {
            self.sent.push(frame.to_vec());
            if self.short_write {
                Ok(frame.len().saturating_sub(1))
            } else {
                Ok(frame.len())
            }
        }

        fn recv(&mut self, buf: &mut [u8], flags: RecvFlags) -> io::Result<Datagram> {
            let Some((frame, sender)) = self.replies.front().cloned() else {
                return Err(io::ErrorKind::WouldBlock.into());
            };
            if !flags.peek {
                self.replies.pop_front();
            }
            let len = frame.len().min(buf.len());
            buf[..len].copy_from_slice(&frame[..len]);
            Ok(Datagram {
                len,
                sender: Some(sender),
                truncated: frame.len() > buf.len(),
            })
        }

        fn close(&mut self) {
            self.closed = true;
        }

        fn is_closed(&self) -> bool {
            self.closed
        }
    }

    fn frame(ty: MessageType, seq: u32, payload: Vec<u8>) -> Vec<u8> {
        AuditMessage::new(ty, NetlinkFlags::empty(), payload)
            .unwrap()
            .with_sequence(seq)
            .encode()
    }

    fn ack(seq: u32, error: i32) -> Vec<u8> {
        let payload = NetlinkError {
            error,
            request: None,
        }
        .encode();
        frame(MessageType::ERROR, seq, payload)
    }

    #[test]
    fn test_sequence_wraps_to_one() {
        let mut client = AuditClient::with_transport(Scripted::default());
        client.sequence = MAX_SEQUENCE;
        assert_eq!(client.next_sequence(), 1);
        assert_eq!(client.next_sequence(), 2);
    }

    #[test]
    fn test_send_sets_request_flag() {
        let mut client = AuditClient::with_transport(Scripted::default());
        let seq = client
            .send(MessageType::USER, b"msg", NetlinkFlags::empty())
            .unwrap();
        assert_eq!(seq, 1);
        let sent = AuditMessage::decode(&client.transport().sent[0]).unwrap();
        assert_eq!(sent.header().flags, NetlinkFlags::REQUEST.bits());
        assert_eq!(sent.sequence(), 1);
    }

    #[test]
    fn test_short_write_is_transport_error() {
        let mut client = AuditClient::with_transport(Scripted {
            short_write: true,
            ..Scripted::default()
        });
        let err = client
            .send(MessageType::USER, b"msg", NetlinkFlags::empty())
            .unwrap_err();
        assert!(matches!(err, AuditError::Transport { op: "send", .. }));
    }

    #[test]
    fn test_oversized_send_never_reaches_transport() {
        let mut client = AuditClient::with_transport(Scripted::default());
        let payload = vec![0u8; crate::MAX_AUDIT_MESSAGE_LENGTH.saturating_add(1)];
        let err = client
            .send(MessageType::USER, &payload, NetlinkFlags::empty())
            .unwrap_err();
        assert!(matches!(err, AuditError::MessageTooLarge { .. }));
        assert!(client.transport().sent.is_empty());
        assert_eq!(client.last_sequence(), 0);
    }

    #[test]
    fn test_closed_client_fails() {
        let mut client = AuditClient::with_transport(Scripted::default());
        client.close();
        assert!(client.is_closed());
        assert!(matches!(
            client.get_reply(ReplyMode::NonBlocking, false),
            Err(AuditError::Closed)
        ));
        assert!(matches!(
            client.set_pid(1, WaitMode::No),
            Err(AuditError::Closed)
        ));
    }

    #[test]
    fn test_set_pid_yes_consumes_ack() {
        let mut transport = Scripted::default();
        transport.replies.push_back((ack(1, 0), 0));
        let mut client = AuditClient::with_transport(transport);

        client.set_pid(1234, WaitMode::Yes).unwrap();
        assert!(client.transport().replies.is_empty());

        let sent = AuditMessage::decode(&client.transport().sent[0]).unwrap();
        assert_eq!(sent.message_type(), MessageType::SET);
        assert!(sent.header().netlink_flags().contains(NetlinkFlags::ACK));
        let status = AuditStatus::decode(sent.payload()).unwrap();
        assert_eq!(status.pid, 1234);
    }

    #[test]
    fn test_set_pid_kernel_error() {
        let mut transport = Scripted::default();
        transport.replies.push_back((ack(1, -13), 0));
        let mut client = AuditClient::with_transport(transport);

        let err = client.set_pid(1234, WaitMode::Yes).unwrap_err();
        assert!(matches!(err, AuditError::Kernel { errno: 13 }));
        assert_eq!(err.code(), -13);
        assert!(client.transport().replies.is_empty());
    }

    #[test]
    fn test_set_pid_sequence_mismatch() {
        let mut transport = Scripted::default();
        transport.replies.push_back((ack(9, 0), 0));
        let mut client = AuditClient::with_transport(transport);

        let err = client.set_pid(1234, WaitMode::Yes).unwrap_err();
        assert!(matches!(
            err,
            AuditError::Protocol(ProtocolError::SequenceMismatch {
                expected: 1,
                actual: 9
            })
        ));
    }

    #[test]
    fn test_set_pid_no_wait_leaves_queue() {
        let mut client = AuditClient::with_transport(Scripted::default());
        client.set_pid(77, WaitMode::No).unwrap();
        let sent = AuditMessage::decode(&client.transport().sent[0]).unwrap();
        assert!(!sent.header().netlink_flags().contains(NetlinkFlags::ACK));
    }

    #[test]
    fn test_foreign_sender_rejected() {
        let mut transport = Scripted::default();
        transport.replies.push_back((ack(1, 0), 4242));
        let mut client = AuditClient::with_transport(transport);

        let err = client.get_reply(ReplyMode::Blocking, false).unwrap_err();
        assert!(matches!(
            err,
            AuditError::Protocol(ProtocolError::ForeignSender { port: 4242 })
        ));
    }

    #[test]
    fn test_truncated_frame_rejected() {
        let mut transport = Scripted::default();
        transport
            .replies
            .push_back((vec![0u8; MAX_FRAME_LENGTH.saturating_add(100)], 0));
        let mut client = AuditClient::with_transport(transport);

        let err = client.get_reply(ReplyMode::Blocking, false).unwrap_err();
        assert!(matches!(
            err,
            AuditError::Protocol(ProtocolError::Truncated { .. })
        ));
    }

    #[test]
    fn test_malformed_frame_rejected() {
        let mut transport = Scripted::default();
        transport.replies.push_back((vec![1, 2, 3, 4, 5], 0));
        let mut client = AuditClient::with_transport(transport);

        let err = client.get_reply(ReplyMode::Blocking, false).unwrap_err();
        assert!(matches!(
            err,
            AuditError::Protocol(ProtocolError::ShortFrame { received: 5 })
        ));
    }

    #[test]
    fn test_get_status() {
        let status = AuditStatus {
            enabled: 1,
            pid: 99,
            ..AuditStatus::default()
        };
        let mut transport = Scripted::default();
        transport
            .replies
            .push_back((frame(MessageType::GET, 1, status.encode()), 0));
        let mut client = AuditClient::with_transport(transport);

        let got = client.get_status(ReplyMode::Blocking).unwrap();
        assert_eq!(got.pid, 99);
        assert!(got.is_enabled());
    }

    #[test]
    fn test_get_status_kernel_error() {
        let mut transport = Scripted::default();
        transport.replies.push_back((ack(1, -1), 0));
        let mut client = AuditClient::with_transport(transport);

        let err = client.get_status(ReplyMode::Blocking).unwrap_err();
        assert!(matches!(err, AuditError::Kernel { errno: 1 }));
    }

    #[test]
    fn test_get_status_unexpected_type() {
        let mut transport = Scripted::default();
        transport
            .replies
            .push_back((frame(MessageType::USER, 1, b"hi".to_vec()), 0));
        let mut client = AuditClient::with_transport(transport);

        let err = client.get_status(ReplyMode::Blocking).unwrap_err();
        assert!(matches!(
            err,
            AuditError::Protocol(ProtocolError::UnexpectedType { .. })
        ));
    }

    #[test]
    fn test_set_pid_defers_record_before_ack() {
        let mut transport = Scripted::default();
        transport.replies.push_back((
            frame(MessageType::CONFIG_CHANGE, 0, b"op=set audit_pid=1234".to_vec()),
            0,
        ));
        transport.replies.push_back((ack(1, 0), 0));
        let mut client = AuditClient::with_transport(transport);

        client.set_pid(1234, WaitMode::Yes).unwrap();
        assert!(client.transport().replies.is_empty());
        assert_eq!(client.deferred_len(), 1);

        let peeked = client.get_reply(ReplyMode::NonBlocking, true).unwrap();
        let record = client.get_reply(ReplyMode::NonBlocking, false).unwrap();
        assert_eq!(peeked, record);
        assert_eq!(record.message_type(), MessageType::CONFIG_CHANGE);
        assert_eq!(record.sequence(), 0);
        assert_eq!(client.deferred_len(), 0);
        assert!(matches!(
            client.get_reply(ReplyMode::NonBlocking, false),
            Err(AuditError::WouldBlock)
        ));
    }

    #[test]
    fn test_set_pid_status_reply_counts_as_ack() {
        let mut transport = Scripted::default();
        transport
            .replies
            .push_back((frame(MessageType::GET, 1, AuditStatus::default().encode()), 0));
        let mut client = AuditClient::with_transport(transport);

        client.set_pid(1234, WaitMode::Yes).unwrap();
        assert_eq!(client.deferred_len(), 0);
    }

    #[test]
    fn test_get_status_defers_unrelated_record() {
        let status = AuditStatus {
            pid: 7,
            ..AuditStatus::default()
        };
        let mut transport = Scripted::default();
        transport
            .replies
            .push_back((frame(MessageType::USER, 0, b"hello".to_vec()), 0));
        transport
            .replies
            .push_back((frame(MessageType::GET, 1, status.encode()), 0));
        let mut client = AuditClient::with_transport(transport);

        assert_eq!(client.get_status(ReplyMode::Blocking).unwrap().pid, 7);
        let record = client.get_reply(ReplyMode::NonBlocking, false).unwrap();
        assert_eq!(record.message_type(), MessageType::USER);
    }
}
