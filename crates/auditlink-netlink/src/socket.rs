//! `NETLINK_AUDIT` socket backed by `nix`.

use std::io::{self, IoSliceMut};
use std::os::fd::{AsRawFd, OwnedFd};

use nix::errno::Errno;
use nix::sys::socket::{
    AddressFamily, MsgFlags, NetlinkAddr, SockFlag, SockProtocol, SockType, recvmsg, sendto,
    socket,
};
use tracing::debug;

use crate::transport::{Datagram, RecvFlags, Transport};

/// An owned audit netlink socket.
///
/// The descriptor is released by [`close`](Transport::close) or on drop,
/// whichever comes first.
#[derive(Debug)]
pub struct NetlinkSocket {
    fd: Option<OwnedFd>,
}

impl NetlinkSocket {
    /// Create a raw netlink socket on the audit protocol.
    ///
    /// # Errors
    ///
    /// Returns the `socket(2)` error unchanged (for example `EPERM`,
    /// `EMFILE`, `EPROTONOSUPPORT`).
    pub fn open() -> io::Result<Self> {
        let fd = socket(
            AddressFamily::Netlink,
            SockType::Raw,
            SockFlag::SOCK_CLOEXEC,
            SockProtocol::NetlinkAudit,
        )?;
        debug!(fd = fd.as_raw_fd(), "opened audit netlink socket");
        Ok(Self { fd: Some(fd) })
    }

    fn raw_fd(&self) -> io::Result<i32> {
        self.fd
            .as_ref()
            .map(AsRawFd::as_raw_fd)
            .ok_or_else(|| io::Error::from(Errno::EBADF))
    }
}

impl Transport for NetlinkSocket {
    fn send(&mut self, frame: &[u8]) -> io::Result<usize> {
        let fd = self.raw_fd()?;
        let kernel = NetlinkAddr::new(0, 0);
        loop {
            match sendto(fd, frame, &kernel, MsgFlags::empty()) {
                Err(Errno::EINTR) => {},
                result => return result.map_err(io::Error::from),
            }
        }
    }

    fn recv(&mut self, buf: &mut [u8], flags: RecvFlags) -> io::Result<Datagram> {
        let fd = self.raw_fd()?;
        let mut msg_flags = MsgFlags::empty();
        if flags.peek {
            msg_flags |= MsgFlags::MSG_PEEK;
        }
        if flags.nonblocking {
            msg_flags |= MsgFlags::MSG_DONTWAIT;
        }

        loop {
            let mut iov = [IoSliceMut::new(buf)];
            match recvmsg::<NetlinkAddr>(fd, &mut iov, None, msg_flags) {
                Err(Errno::EINTR) => {},
                Err(e) => return Err(io::Error::from(e)),
                Ok(msg) => {
                    return Ok(Datagram {
                        len: msg.bytes,
                        sender: msg.address.map(|addr| addr.pid()),
                        truncated: msg.flags.contains(MsgFlags::MSG_TRUNC),
                    });
                },
            }
        }
    }

    fn close(&mut self) {
        if let Some(fd) = self.fd.take() {
            debug!(fd = fd.as_raw_fd(), "closing audit netlink socket");
        }
    }

    fn is_closed(&self) -> bool {
        self.fd.is_none()
    }
}
