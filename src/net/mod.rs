//! Non-blocking socket transport over the platform BSD-socket surface.

pub mod accept;
pub mod iface;
pub mod socket;

pub use accept::{Accepted, accept_connection};
pub use iface::{
    ActiveInterfaces, Interface, InterfaceProvider, IpInfo, MAX_ACTIVE_INTERFACES, StaticProvider,
    WifiMode, active_interfaces,
};
pub use socket::Socket;

/// Progress of a single non-blocking transport call.
///
/// Together with [`crate::Result`], this forms the tri-state outcome shared
/// by polling, receiving, and accepting: `Ok(Ready(..))` completed,
/// `Ok(Pending)` would block and should be retried on a later tick of the
/// cooperative loop, `Err(..)` failed terminally. One type everywhere means
/// callers implement one retry discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress<T> {
    /// The operation completed with a value.
    Ready(T),
    /// The operation would block; this is the expected steady state between
    /// incoming connections or pending bytes, not an error.
    Pending,
}

impl<T> Progress<T> {
    /// Returns `true` if the call completed.
    pub fn is_ready(&self) -> bool {
        matches!(*self, Progress::Ready(_))
    }

    /// Returns `true` if the call would have blocked.
    pub fn is_pending(&self) -> bool {
        matches!(*self, Progress::Pending)
    }
}
