//! Accepting pending client connections and attributing them to the
//! originating network interface.

use std::net::Ipv4Addr;
use std::os::unix::io::AsRawFd;
use std::{io, mem};

use crate::error::{Error, Result, errno};
use crate::net::Progress;
use crate::net::iface::{InterfaceProvider, active_interfaces};
use crate::net::socket::Socket;
use crate::{debug, error, info};

/// A client connection produced by [`accept_connection`].
#[derive(Debug)]
pub struct Accepted {
    /// The established client socket, owned by the caller from here on.
    pub socket: Socket,
    /// The local address of the interface the client arrived on, when
    /// attribution was requested. [`Ipv4Addr::UNSPECIFIED`] when no active
    /// interface's subnet contained the peer; `None` when attribution was not
    /// requested.
    pub local_ip: Option<Ipv4Addr>,
}

/// Accepts a pending client connection on a listening socket, if there is
/// one.
///
/// With no connection pending this reports [`Progress::Pending`], the
/// expected steady state between incoming connections. On success, when
/// `want_ip` is set, the active interfaces are enumerated and the first one
/// whose subnet contains the peer address is taken as the interface the
/// client arrived on; its address is reported as `local_ip`. No match is a
/// diagnostic anomaly, not a failure: the connection still succeeds and the
/// zero address is reported.
///
/// The new descriptor's blocking mode is set according to `nonblocking`
/// before it is returned. Non-blocking suits the cooperative polling loop; a
/// dedicated data-transfer channel may prefer blocking.
///
/// Any failing path releases the partially accepted descriptor before
/// returning.
pub fn accept_connection<P: InterfaceProvider + ?Sized>(
    listener: &Socket,
    provider: &P,
    want_ip: bool,
    nonblocking: bool,
) -> Result<Progress<Accepted>> {
    if !listener.is_open() {
        return Err(Error::InvalidSocket);
    }

    let mut peer: libc::sockaddr_in = unsafe { mem::zeroed() };
    // The address length must be initialized to the structure size before the
    // call; accept reads it as the available capacity.
    let mut peer_len = mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;

    let fd = unsafe {
        libc::accept(
            listener.as_raw_fd(),
            &raw mut peer as *mut libc::sockaddr,
            &raw mut peer_len,
        )
    };
    if fd < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::WouldBlock {
            return Ok(Progress::Pending);
        }
        return Err(Error::Io(io::Error::new(
            err.kind(),
            format!("failed to accept connection: {err}"),
        )));
    }

    // Owned from here on: every failing path below closes it on drop.
    let client = Socket::from_fd(fd);

    let local_ip = if want_ip {
        Some(attribute_client(&client, provider)?)
    } else {
        None
    };

    client.set_nonblocking(nonblocking)?;

    Ok(Progress::Ready(Accepted {
        socket: client,
        local_ip,
    }))
}

/// Resolves which active interface the client connected through, returning
/// that interface's own address, or the zero address when no subnet matches.
fn attribute_client<P: InterfaceProvider + ?Sized>(
    client: &Socket,
    provider: &P,
) -> Result<Ipv4Addr> {
    let peer = peer_addr(client)?;
    info!("client address: {peer}");

    let active = active_interfaces(provider);
    if active.is_empty() {
        error!("no active interface for client {peer}");
        return Ok(Ipv4Addr::UNSPECIFIED);
    }

    for iface in active.iter() {
        let Some(ip_info) = provider.ip_info(iface) else {
            continue;
        };
        debug!("interface {iface}: {}/{}", ip_info.addr, ip_info.netmask);

        if ip_info.contains(peer) {
            info!("client {peer} connected on interface {iface}");
            return Ok(ip_info.addr);
        }
    }

    error!("no interface subnet matches client {peer}");
    Ok(Ipv4Addr::UNSPECIFIED)
}

/// Queries the peer address of an established connection.
fn peer_addr(sock: &Socket) -> Result<Ipv4Addr> {
    let mut addr: libc::sockaddr_in = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;

    if unsafe {
        libc::getpeername(
            sock.as_raw_fd(),
            &raw mut addr as *mut libc::sockaddr,
            &raw mut len,
        )
    } == -1
    {
        return Err(Error::Io(errno!("failed to query peer address")));
    }

    Ok(Ipv4Addr::from(u32::from_be(addr.sin_addr.s_addr)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::iface::{IpInfo, StaticProvider, WifiMode};

    use std::net::TcpStream;
    use std::thread;
    use std::time::Duration;

    /// Loopback peers always arrive from 127.0.0.0/8.
    const LOOPBACK: IpInfo = IpInfo {
        addr: Ipv4Addr::new(127, 0, 0, 1),
        netmask: Ipv4Addr::new(255, 0, 0, 0),
    };

    /// A subnet a loopback peer can never belong to.
    const FOREIGN: IpInfo = IpInfo {
        addr: Ipv4Addr::new(192, 168, 4, 1),
        netmask: Ipv4Addr::new(255, 255, 255, 0),
    };

    fn accept_ready<P: InterfaceProvider>(
        listener: &Socket,
        provider: &P,
        want_ip: bool,
        nonblocking: bool,
    ) -> Accepted {
        for _ in 0..200 {
            match accept_connection(listener, provider, want_ip, nonblocking).unwrap() {
                Progress::Ready(accepted) => return accepted,
                Progress::Pending => thread::sleep(Duration::from_millis(5)),
            }
        }
        panic!("no connection arrived");
    }

    fn listener_and_peer() -> (Socket, TcpStream) {
        let listener = Socket::listen(0, 1).unwrap();
        let port = listener.local_port().unwrap();
        let stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        (listener, stream)
    }

    #[test]
    fn accept_with_no_pending_client_is_pending() {
        let listener = Socket::listen(0, 1).unwrap();
        let provider = StaticProvider::new(WifiMode::Station).with_station(LOOPBACK);

        let outcome = accept_connection(&listener, &provider, true, true).unwrap();
        assert!(outcome.is_pending());
    }

    #[test]
    fn accept_on_closed_listener_is_an_error() {
        let mut listener = Socket::listen(0, 1).unwrap();
        listener.close();

        let provider = StaticProvider::default();
        assert!(matches!(
            accept_connection(&listener, &provider, false, true),
            Err(Error::InvalidSocket)
        ));
    }

    #[test]
    fn accept_without_attribution_reports_no_ip() {
        let (listener, _stream) = listener_and_peer();
        let provider = StaticProvider::new(WifiMode::Station).with_station(LOOPBACK);

        let accepted = accept_ready(&listener, &provider, false, true);
        assert!(accepted.socket.is_open());
        assert_eq!(accepted.local_ip, None);
    }

    #[test]
    fn peer_is_attributed_to_the_matching_interface() {
        let (listener, _stream) = listener_and_peer();
        let provider = StaticProvider::new(WifiMode::Station).with_station(LOOPBACK);

        let accepted = accept_ready(&listener, &provider, true, true);
        assert_eq!(accepted.local_ip, Some(LOOPBACK.addr));
    }

    #[test]
    fn attribution_skips_a_non_matching_interface_enumerated_first() {
        let (listener, _stream) = listener_and_peer();

        // Station enumerates first but its subnet does not contain the peer;
        // the access point's does.
        let provider = StaticProvider::new(WifiMode::StationAccessPoint)
            .with_station(FOREIGN)
            .with_access_point(LOOPBACK);

        let accepted = accept_ready(&listener, &provider, true, true);
        assert_eq!(accepted.local_ip, Some(LOOPBACK.addr));
    }

    #[test]
    fn attribution_picks_the_first_match_in_enumeration_order() {
        let (listener, _stream) = listener_and_peer();

        let provider = StaticProvider::new(WifiMode::StationAccessPoint)
            .with_station(LOOPBACK)
            .with_access_point(FOREIGN);

        let accepted = accept_ready(&listener, &provider, true, true);
        assert_eq!(accepted.local_ip, Some(LOOPBACK.addr));
    }

    #[test]
    fn no_active_interface_reports_the_zero_address() {
        let (listener, _stream) = listener_and_peer();

        // A failed mode query enumerates no interfaces; the accept itself
        // still succeeds.
        let provider = StaticProvider::default();

        let accepted = accept_ready(&listener, &provider, true, true);
        assert!(accepted.socket.is_open());
        assert_eq!(accepted.local_ip, Some(Ipv4Addr::UNSPECIFIED));
    }

    #[test]
    fn no_matching_subnet_reports_the_zero_address() {
        let (listener, _stream) = listener_and_peer();

        let provider = StaticProvider::new(WifiMode::Station).with_station(FOREIGN);

        let accepted = accept_ready(&listener, &provider, true, true);
        assert_eq!(accepted.local_ip, Some(Ipv4Addr::UNSPECIFIED));
    }

    #[test]
    fn interface_without_address_info_is_skipped() {
        let (listener, _stream) = listener_and_peer();

        // Dual mode, but only the access point has an address assigned.
        let provider =
            StaticProvider::new(WifiMode::StationAccessPoint).with_access_point(LOOPBACK);

        let accepted = accept_ready(&listener, &provider, true, true);
        assert_eq!(accepted.local_ip, Some(LOOPBACK.addr));
    }

    #[test]
    fn connection_lifecycle_end_to_end() {
        use std::io::Read;

        let listener = Socket::listen(0, 1).unwrap();
        let port = listener.local_port().unwrap();
        let provider = StaticProvider::new(WifiMode::Station).with_station(LOOPBACK);

        // No client yet: the steady state is pending, not an error.
        let outcome = accept_connection(&listener, &provider, true, true).unwrap();
        assert!(outcome.is_pending());

        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();

        let mut accepted = accept_ready(&listener, &provider, true, true);
        assert!(accepted.socket.is_open());
        assert_eq!(accepted.local_ip, Some(LOOPBACK.addr));

        assert_eq!(accepted.socket.send(b"hello").unwrap(), 5);
        let mut buf = [0u8; 5];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        accepted.socket.close();
        assert!(matches!(
            accepted.socket.poll_readable(),
            Err(Error::InvalidSocket)
        ));
    }
}
