//! Mock implementations for testing.

use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use auditlink_netlink::{
    AuditMessage, AuditStatus, Datagram, MessageType, NetlinkFlags, RecvFlags, Transport,
};
use nix::errno::Errno;
use tracing::trace;

use crate::fixtures::{ack_for, status_frame};

type Responder = Box<dyn FnMut(&AuditMessage) -> Vec<Vec<u8>> + Send>;

/// A datagram waiting to be received.
#[derive(Debug, Clone)]
struct Queued {
    bytes: Vec<u8>,
    sender: Option<u32>,
}

#[derive(Default)]
struct KernelState {
    queue: VecDeque<Queued>,
    sent: Vec<Vec<u8>>,
    send_errors: VecDeque<i32>,
    recv_errors: VecDeque<i32>,
    short_write: Option<usize>,
    responders: Vec<Responder>,
    closed: bool,
}

/// Mock of the kernel side of a `NETLINK_AUDIT` socket.
///
/// Clones share state, so a test can hand one clone to an
/// [`AuditClient`](auditlink_netlink::AuditClient) and keep another to queue
/// replies and inspect what was sent.
///
/// A blocking receive on an empty queue fails with
/// [`io::ErrorKind::TimedOut`] instead of hanging the test.
#[derive(Clone, Default)]
pub struct MockKernel {
    state: Arc<Mutex<KernelState>>,
}

impl fmt::Debug for MockKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("MockKernel")
            .field("queued", &state.queue.len())
            .field("sent", &state.sent.len())
            .field("closed", &state.closed)
            .finish_non_exhaustive()
    }
}

impl MockKernel {
    /// Create an empty mock kernel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, KernelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a frame from the kernel (sender port 0).
    #[must_use]
    pub fn with_reply(self, frame: Vec<u8>) -> Self {
        self.push_reply(frame);
        self
    }

    /// Queue a frame that claims to come from `port`.
    #[must_use]
    pub fn with_reply_from(self, port: u32, frame: Vec<u8>) -> Self {
        self.state().queue.push_back(Queued {
            bytes: frame,
            sender: Some(port),
        });
        self
    }

    /// Queue a frame delivered without a sender address.
    #[must_use]
    pub fn with_anonymous_reply(self, frame: Vec<u8>) -> Self {
        self.state().queue.push_back(Queued {
            bytes: frame,
            sender: None,
        });
        self
    }

    /// Acknowledge every request that asks for it (`NLM_F_ACK`).
    #[must_use]
    pub fn with_auto_ack(self) -> Self {
        self.on_request(|request| {
            if request.header().netlink_flags().contains(NetlinkFlags::ACK) {
                vec![ack_for(request)]
            } else {
                Vec::new()
            }
        })
    }

    /// Answer every `AUDIT_GET` with `status`.
    #[must_use]
    pub fn with_status(self, status: AuditStatus) -> Self {
        self.on_request(move |request| {
            if request.message_type() == MessageType::GET {
                vec![status_frame(request.sequence(), &status)]
            } else {
                Vec::new()
            }
        })
    }

    /// Run `responder` on every decoded request; the frames it returns are
    /// queued as kernel replies.
    #[must_use]
    pub fn on_request<F>(self, responder: F) -> Self
    where
        F: FnMut(&AuditMessage) -> Vec<Vec<u8>> + Send + 'static,
    {
        self.state().responders.push(Box::new(responder));
        self
    }

    /// Fail the next send with OS error `errno`.
    #[must_use]
    pub fn with_send_error(self, errno: i32) -> Self {
        self.state().send_errors.push_back(errno);
        self
    }

    /// Fail the next receive with OS error `errno`.
    #[must_use]
    pub fn with_recv_error(self, errno: i32) -> Self {
        self.state().recv_errors.push_back(errno);
        self
    }

    /// Report only `written` bytes for every send.
    #[must_use]
    pub fn with_short_write(self, written: usize) -> Self {
        self.state().short_write = Some(written);
        self
    }

    /// Queue a frame from the kernel on a shared handle.
    pub fn push_reply(&self, frame: Vec<u8>) {
        self.state().queue.push_back(Queued {
            bytes: frame,
            sender: Some(0),
        });
    }

    /// Raw frames sent so far, oldest first.
    #[must_use]
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.state().sent.clone()
    }

    /// Sent frames decoded as audit messages; undecodable frames are skipped.
    #[must_use]
    pub fn sent_messages(&self) -> Vec<AuditMessage> {
        self.state()
            .sent
            .iter()
            .filter_map(|frame| AuditMessage::decode(frame).ok())
            .collect()
    }

    /// Number of datagrams still queued.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state().queue.len()
    }
}

impl Transport for MockKernel {
    fn send(&mut self, frame: &[u8]) -> io::Result<usize> {
        let mut state = self.state();
        if state.closed {
            return Err(io::Error::from(Errno::EBADF));
        }
        if let Some(errno) = state.send_errors.pop_front() {
            return Err(io::Error::from_raw_os_error(errno));
        }

        state.sent.push(frame.to_vec());
        if let Ok(request) = AuditMessage::decode(frame) {
            trace!(
                ty = %request.message_type(),
                seq = request.sequence(),
                "mock kernel received request"
            );
            let mut replies = Vec::new();
            for responder in &mut state.responders {
                replies.extend(responder(&request));
            }
            state.queue.extend(replies.into_iter().map(|bytes| Queued {
                bytes,
                sender: Some(0),
            }));
        }

        Ok(state.short_write.map_or(frame.len(), |n| n.min(frame.len())))
    }

    fn recv(&mut self, buf: &mut [u8], flags: RecvFlags) -> io::Result<Datagram> {
        let mut state = self.state();
        if state.closed {
            return Err(io::Error::from(Errno::EBADF));
        }
        if let Some(errno) = state.recv_errors.pop_front() {
            return Err(io::Error::from_raw_os_error(errno));
        }

        let queued = if flags.peek {
            state.queue.front().cloned()
        } else {
            state.queue.pop_front()
        };
        let Some(queued) = queued else {
            return Err(if flags.nonblocking {
                io::Error::from(io::ErrorKind::WouldBlock)
            } else {
                io::Error::new(io::ErrorKind::TimedOut, "mock kernel has nothing queued")
            });
        };

        let len = queued.bytes.len().min(buf.len());
        if let (Some(dst), Some(src)) = (buf.get_mut(..len), queued.bytes.get(..len)) {
            dst.copy_from_slice(src);
        }
        Ok(Datagram {
            len,
            sender: queued.sender,
            truncated: queued.bytes.len() > buf.len(),
        })
    }

    fn close(&mut self) {
        self.state().closed = true;
    }

    fn is_closed(&self) -> bool {
        self.state().closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ack_frame, text_frame};

    #[test]
    fn test_peek_leaves_frame_queued() {
        let mut kernel = MockKernel::new().with_reply(ack_frame(1));
        let mut buf = vec![0u8; 64];

        let peeked = kernel
            .recv(&mut buf, RecvFlags {
                peek: true,
                nonblocking: true,
            })
            .unwrap();
        assert_eq!(kernel.pending(), 1);

        let taken = kernel.recv(&mut buf, RecvFlags::default()).unwrap();
        assert_eq!(peeked, taken);
        assert_eq!(kernel.pending(), 0);
    }

    #[test]
    fn test_empty_queue() {
        let mut kernel = MockKernel::new();
        let mut buf = vec![0u8; 64];

        let err = kernel
            .recv(&mut buf, RecvFlags {
                peek: false,
                nonblocking: true,
            })
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);

        let err = kernel.recv(&mut buf, RecvFlags::default()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn test_small_buffer_reports_truncation() {
        let mut kernel = MockKernel::new().with_reply(text_frame(MessageType::USER, 1, "hello"));
        let mut buf = vec![0u8; 8];

        let datagram = kernel.recv(&mut buf, RecvFlags::default()).unwrap();
        assert!(datagram.truncated);
        assert_eq!(datagram.len, 8);
    }

    #[test]
    fn test_closed_kernel_rejects_io() {
        let mut kernel = MockKernel::new();
        kernel.close();
        assert!(kernel.is_closed());
        assert_eq!(
            kernel.send(&[0u8; 16]).unwrap_err().raw_os_error(),
            Some(Errno::EBADF as i32)
        );
    }

    #[test]
    fn test_clones_share_state() {
        let handle = MockKernel::new();
        let mut kernel = handle.clone();
        kernel.send(&[1, 2, 3]).unwrap();
        assert_eq!(handle.sent(), vec![vec![1, 2, 3]]);
    }
}
