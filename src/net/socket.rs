//! Socket lifecycle, readiness polling, and byte-level non-blocking I/O.

use std::os::unix::io::{AsRawFd, RawFd};
use std::{io, mem};

use crate::error::{Error, Result, errno};
use crate::net::Progress;

/// Sentinel marking a closed or never-opened descriptor.
const INVALID_FD: RawFd = -1;

/// An owned handle over a raw socket descriptor.
///
/// The handle tracks its own validity: a closed socket holds the invalid
/// sentinel, and every operation on a closed handle reports
/// [`Error::InvalidSocket`] instead of touching the platform. Closing is
/// idempotent, and dropping the handle closes it, so no exit path can leak a
/// partially-constructed descriptor.
#[derive(Debug)]
pub struct Socket {
    fd: RawFd,
}

impl Socket {
    /// Creates a listening socket bound to `INADDR_ANY:port`.
    ///
    /// The socket is configured non-blocking with address reuse enabled
    /// before binding, then starts listening with the given backlog. If any
    /// step fails the partially created descriptor is closed and
    /// [`Error::Setup`] is reported; no partially usable socket is ever
    /// returned.
    pub fn listen(port: u16, backlog: i32) -> Result<Self> {
        let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_STREAM, libc::IPPROTO_IP) };
        if fd < 0 {
            return Err(Error::Setup(errno!("failed to create stream socket")));
        }

        let mut sock = Socket { fd };
        if let Err(err) = sock.configure_listener(port, backlog) {
            sock.close();
            return Err(match err {
                Error::Io(io) => Error::Setup(io),
                other => other,
            });
        }

        Ok(sock)
    }

    fn configure_listener(&self, port: u16, backlog: i32) -> Result<()> {
        self.set_nonblocking(true)?;

        let reuse: libc::c_int = 1;
        if unsafe {
            libc::setsockopt(
                self.fd,
                libc::SOL_SOCKET,
                libc::SO_REUSEADDR,
                &raw const reuse as *const libc::c_void,
                mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        } == -1
        {
            return Err(Error::Io(errno!("failed to enable address reuse")));
        }

        let mut addr: libc::sockaddr_in = unsafe { mem::zeroed() };
        addr.sin_family = libc::AF_INET as libc::sa_family_t;
        addr.sin_addr.s_addr = libc::INADDR_ANY.to_be();
        addr.sin_port = port.to_be();

        if unsafe {
            libc::bind(
                self.fd,
                &raw const addr as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
            )
        } == -1
        {
            return Err(Error::Io(errno!("failed to bind to port {port}")));
        }

        if unsafe { libc::listen(self.fd, backlog) } == -1 {
            return Err(Error::Io(errno!("failed to listen with backlog {backlog}")));
        }

        Ok(())
    }

    /// Wraps an already-established descriptor, e.g. one returned by a
    /// successful accept.
    pub(crate) fn from_fd(fd: RawFd) -> Self {
        Socket { fd }
    }

    /// Returns `true` while the handle owns a live descriptor.
    pub fn is_open(&self) -> bool {
        self.fd >= 0
    }

    /// Closes the socket, releasing the underlying descriptor.
    ///
    /// Idempotent: closing an already-closed handle is a no-op, and no second
    /// underlying close is issued.
    pub fn close(&mut self) {
        if self.fd < 0 {
            return;
        }

        unsafe {
            let _ = libc::close(self.fd);
        }
        self.fd = INVALID_FD;
    }

    /// Configures the descriptor's blocking mode.
    ///
    /// Accepted data-channel connections run blocking; everything driven by
    /// the cooperative loop runs non-blocking.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        if !self.is_open() {
            return Err(Error::InvalidSocket);
        }

        let flags = unsafe { libc::fcntl(self.fd, libc::F_GETFL) };
        if flags == -1 {
            return Err(Error::Io(errno!("failed to get descriptor flags")));
        }

        let flags = if nonblocking {
            flags | libc::O_NONBLOCK
        } else {
            flags & !libc::O_NONBLOCK
        };

        if unsafe { libc::fcntl(self.fd, libc::F_SETFL, flags) } == -1 {
            return Err(Error::Io(errno!("failed to set descriptor flags")));
        }

        Ok(())
    }

    /// Checks whether there is data to read, without blocking.
    ///
    /// Issues a zero-timeout poll for read events: [`Progress::Ready`] when
    /// input is pending, [`Progress::Pending`] when there is none yet. If the
    /// poll itself reports an error the socket is closed as a side effect
    /// before the error is returned, so callers need not separately detect
    /// stale descriptors.
    pub fn poll_readable(&mut self) -> Result<Progress<()>> {
        if !self.is_open() {
            return Err(Error::InvalidSocket);
        }

        let mut pd = libc::pollfd {
            fd: self.fd,
            events: libc::POLLIN,
            revents: 0,
        };

        let ret = unsafe { libc::poll(&raw mut pd, 1, 0) };

        if pd.revents & libc::POLLIN != 0 {
            return Ok(Progress::Ready(()));
        }

        if ret == -1 {
            // Capture errno before the close can clobber it.
            let err = errno!("readiness poll failed");
            self.close();
            return Err(Error::Io(err));
        }

        Ok(Progress::Pending)
    }

    /// Sends exactly one byte, flushing immediately.
    pub fn send_byte(&self, byte: u8) -> Result<usize> {
        self.send_byte_hinted(byte, true)
    }

    /// Sends exactly one byte with a batching hint.
    ///
    /// When `last` is `false` the transport is told more data follows and may
    /// delay flushing, coalescing subsequent single-byte sends into fewer
    /// packets. The hint only affects packetization, never correctness or
    /// ordering.
    pub fn send_byte_hinted(&self, byte: u8, last: bool) -> Result<usize> {
        let flags = if last { 0 } else { libc::MSG_MORE };
        self.send_with_flags(&[byte], flags)
    }

    /// Sends a buffer of bytes in a single underlying call.
    ///
    /// Returns the number of bytes the transport accepted, which may be less
    /// than `data.len()`. This layer never loops to completion; short writes
    /// are handled by the caller.
    pub fn send(&self, data: &[u8]) -> Result<usize> {
        self.send_with_flags(data, 0)
    }

    fn send_with_flags(&self, data: &[u8], flags: libc::c_int) -> Result<usize> {
        if !self.is_open() {
            return Err(Error::InvalidSocket);
        }

        let sent = unsafe {
            libc::send(
                self.fd,
                data.as_ptr() as *const libc::c_void,
                data.len(),
                flags,
            )
        };
        if sent == -1 {
            return Err(Error::Io(errno!("failed to send {} bytes", data.len())));
        }

        Ok(sent as usize)
    }

    /// Attempts a non-blocking receive into `buf`.
    ///
    /// A positive count is [`Progress::Ready`] with that many bytes placed in
    /// the buffer; would-block is [`Progress::Pending`] with nothing written
    /// (steady state, not an error); a zero-length read is [`Error::Closed`]
    /// per standard socket semantics. Unlike [`Socket::poll_readable`], a
    /// receive failure does not close the socket; that is left to the caller.
    pub fn recv_nonblocking(&self, buf: &mut [u8]) -> Result<Progress<usize>> {
        if !self.is_open() {
            return Err(Error::InvalidSocket);
        }

        let read = unsafe {
            libc::recv(
                self.fd,
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
                0,
            )
        };

        if read > 0 {
            return Ok(Progress::Ready(read as usize));
        }
        if read == 0 {
            return Err(Error::Closed);
        }

        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::WouldBlock {
            return Ok(Progress::Pending);
        }

        Err(Error::Io(io::Error::new(
            err.kind(),
            format!("failed to receive: {err}"),
        )))
    }

    /// Returns the port the socket is locally bound to.
    ///
    /// Useful when listening on port 0 and letting the platform pick.
    pub fn local_port(&self) -> Result<u16> {
        if !self.is_open() {
            return Err(Error::InvalidSocket);
        }

        let mut addr: libc::sockaddr_in = unsafe { mem::zeroed() };
        let mut len = mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;

        if unsafe {
            libc::getsockname(
                self.fd,
                &raw mut addr as *mut libc::sockaddr,
                &raw mut len,
            )
        } == -1
        {
            return Err(Error::Io(errno!("failed to query local address")));
        }

        Ok(u16::from_be(addr.sin_port))
    }
}

impl AsRawFd for Socket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        self.close();
    }
}
