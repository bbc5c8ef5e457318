//! Enumeration of the currently active Wi-Fi interfaces.
//!
//! Active interfaces are recomputed from the platform's current Wi-Fi mode on
//! every call, because the mode can change between connection-accept events.
//! The result is a fixed-capacity value snapshot; nothing is retained across
//! calls and no allocation takes place.

use std::fmt;
use std::net::Ipv4Addr;

/// Maximum number of interfaces the platform can run at once.
pub const MAX_ACTIVE_INTERFACES: usize = 2;

/// Identifier of a single network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interface {
    /// The station (client) interface.
    Station,
    /// The access-point interface.
    AccessPoint,
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Interface::Station => write!(f, "STA"),
            Interface::AccessPoint => write!(f, "AP"),
        }
    }
}

/// Wi-Fi operating mode reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiMode {
    /// Station mode only.
    Station,
    /// Access-point mode only.
    AccessPoint,
    /// Station and access point running simultaneously.
    StationAccessPoint,
}

/// IPv4 address and subnet mask assigned to an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpInfo {
    /// The interface's own address.
    pub addr: Ipv4Addr,
    /// The interface's subnet mask.
    pub netmask: Ipv4Addr,
}

impl IpInfo {
    /// Returns `true` when `peer` falls within this interface's subnet, i.e.
    /// both addresses masked by the netmask name the same network.
    pub fn contains(&self, peer: Ipv4Addr) -> bool {
        let mask = u32::from(self.netmask);
        (u32::from(self.addr) & mask) == (mask & u32::from(peer))
    }
}

/// Capability surface onto the platform Wi-Fi subsystem.
///
/// The connection acceptor depends on this abstractly so the real subsystem
/// can be swapped for a test double.
pub trait InterfaceProvider {
    /// The current Wi-Fi operating mode, or `None` when the query fails or
    /// reports a mode this layer does not recognize.
    fn mode(&self) -> Option<WifiMode>;

    /// The address and netmask currently assigned to `iface`, or `None` when
    /// the query fails.
    fn ip_info(&self, iface: Interface) -> Option<IpInfo>;
}

/// Ordered snapshot of the interfaces active at the time of a single
/// enumeration call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveInterfaces {
    ifaces: [Option<Interface>; MAX_ACTIVE_INTERFACES],
    len: usize,
}

impl ActiveInterfaces {
    fn push(&mut self, iface: Interface) {
        debug_assert!(self.len < MAX_ACTIVE_INTERFACES);
        self.ifaces[self.len] = Some(iface);
        self.len += 1;
    }

    /// Number of active interfaces in the snapshot.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when no interface was active.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates over the interfaces in their fixed platform order.
    pub fn iter(&self) -> impl Iterator<Item = Interface> + '_ {
        self.ifaces[..self.len].iter().flatten().copied()
    }
}

/// Queries the platform for the interfaces currently active.
///
/// Station-only mode yields `[STA]`, access-point-only yields `[AP]`, dual
/// mode yields `[STA, AP]` in that fixed order. A failed or unrecognized mode
/// query yields an empty snapshot.
pub fn active_interfaces<P: InterfaceProvider + ?Sized>(provider: &P) -> ActiveInterfaces {
    let mut active = ActiveInterfaces::default();

    match provider.mode() {
        Some(WifiMode::Station) => active.push(Interface::Station),
        Some(WifiMode::AccessPoint) => active.push(Interface::AccessPoint),
        Some(WifiMode::StationAccessPoint) => {
            active.push(Interface::Station);
            active.push(Interface::AccessPoint);
        }
        None => {}
    }

    active
}

/// An [`InterfaceProvider`] backed by a fixed mode and address table.
///
/// Suits firmware images whose addressing is configured once at interface
/// bring-up, and doubles as the provider used throughout the test suite.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticProvider {
    mode: Option<WifiMode>,
    station: Option<IpInfo>,
    access_point: Option<IpInfo>,
}

impl StaticProvider {
    /// Creates a provider reporting the given mode and no assigned addresses.
    pub fn new(mode: WifiMode) -> Self {
        StaticProvider {
            mode: Some(mode),
            station: None,
            access_point: None,
        }
    }

    /// Assigns the station interface's address and netmask.
    pub fn with_station(mut self, info: IpInfo) -> Self {
        self.station = Some(info);
        self
    }

    /// Assigns the access-point interface's address and netmask.
    pub fn with_access_point(mut self, info: IpInfo) -> Self {
        self.access_point = Some(info);
        self
    }
}

impl InterfaceProvider for StaticProvider {
    fn mode(&self) -> Option<WifiMode> {
        self.mode
    }

    fn ip_info(&self, iface: Interface) -> Option<IpInfo> {
        match iface {
            Interface::Station => self.station,
            Interface::AccessPoint => self.access_point,
        }
    }
}
