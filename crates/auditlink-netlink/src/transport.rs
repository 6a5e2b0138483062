//! The socket primitives the audit client is built on.

use std::io;

/// Options for a single receive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecvFlags {
    /// Leave the message queued (`MSG_PEEK`).
    pub peek: bool,
    /// Fail with [`io::ErrorKind::WouldBlock`] instead of waiting
    /// (`MSG_DONTWAIT`).
    pub nonblocking: bool,
}

/// What a receive produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datagram {
    /// Bytes copied into the buffer.
    pub len: usize,
    /// Netlink port id of the sender, if the address was reported.
    pub sender: Option<u32>,
    /// The datagram was larger than the buffer (`MSG_TRUNC`).
    pub truncated: bool,
}

/// Datagram transport to the kernel audit subsystem.
///
/// Implemented by [`NetlinkSocket`](crate::NetlinkSocket) for the real kernel
/// and by test doubles that play the kernel's side.
pub trait Transport {
    /// Send one complete frame, returning the bytes written.
    ///
    /// # Errors
    ///
    /// Returns the OS error of the underlying send.
    fn send(&mut self, frame: &[u8]) -> io::Result<usize>;

    /// Receive one datagram into `buf`.
    ///
    /// # Errors
    ///
    /// Returns the OS error of the underlying receive;
    /// [`io::ErrorKind::WouldBlock`] when non-blocking and nothing is queued.
    fn recv(&mut self, buf: &mut [u8], flags: RecvFlags) -> io::Result<Datagram>;

    /// Release the underlying resource. Idempotent.
    fn close(&mut self);

    /// Whether [`close`](Self::close) has been called.
    fn is_closed(&self) -> bool;
}
