use std::{error, fmt, io, result};

/// Creates an [`std::io::Error`] with a custom message prefixed to the current
/// `errno` value.
macro_rules! errno {
    ($($arg:tt)+) => {{
        let errno = ::std::io::Error::last_os_error();
        let prefix = format!($($arg)+);
        ::std::io::Error::new(errno.kind(), format!("{prefix}: {errno}"))
    }};
}
pub(crate) use errno;

/// A convenience wrapper around `Result` for [crate::Error].
pub type Result<T> = result::Result<T, Error>;

/// Set of errors that can occur while driving the transport.
///
/// The would-block steady state of a non-blocking call is deliberately *not*
/// an error; it is reported as [`crate::net::Progress::Pending`]. Everything
/// here is terminal for the attempted operation.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// The underlying transport call failed. The contained error carries the
    /// `errno` context of the failing call.
    Io(io::Error),
    /// The operation was attempted on an already-closed socket handle.
    InvalidSocket,
    /// The peer closed the connection (a zero-length read).
    Closed,
    /// A step of listening-socket creation failed. The partially created
    /// socket has already been released; no partial success is observable.
    Setup(io::Error),
}

impl error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Io(ref err) => fmt::Display::fmt(err, f),
            Error::InvalidSocket => write!(f, "operation attempted on a closed socket"),
            Error::Closed => write!(f, "connection closed by peer"),
            Error::Setup(ref err) => write!(f, "listening socket setup failed: {err}"),
        }
    }
}
