//! Public address selection
//!
//! Classifies the addresses bound to an interface and picks the one to
//! publish. Enumeration itself is platform code and lives in the IP source
//! crates; everything here is pure.
//!
//! Selection walks the addresses in enumeration order and drops, in turn:
//! non-IPv6 (IPv4-mapped included), link-local (fe80::/10), loopback (::1)
//! and unique-local (fc00::/7). The first survivor that is global unicast
//! wins. There is no preference among several qualifying addresses beyond
//! that order.

use crate::error::{Error, Result};
use std::net::{IpAddr, Ipv6Addr};

/// Scope of an address bound to an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressScope {
    /// ::1
    Loopback,
    /// fe80::/10
    LinkLocal,
    /// fc00::/7
    UniqueLocal,
    /// Routable on the internet
    GlobalUnicast,
    /// IPv4, IPv4-mapped, unspecified or multicast
    Other,
}

/// An address bound to the monitored interface, tagged with its scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub addr: IpAddr,
    pub scope: AddressScope,
}

impl InterfaceAddress {
    pub fn new(addr: IpAddr) -> Self {
        Self {
            addr,
            scope: classify(addr),
        }
    }

    /// The address if it may be published
    pub fn public_ipv6(&self) -> Option<Ipv6Addr> {
        match (self.scope, self.addr) {
            (AddressScope::GlobalUnicast, IpAddr::V6(v6)) => Some(v6),
            _ => None,
        }
    }
}

/// Classify an address
pub fn classify(addr: IpAddr) -> AddressScope {
    let v6 = match addr {
        IpAddr::V4(_) => return AddressScope::Other,
        IpAddr::V6(v6) => v6,
    };

    if v6.to_ipv4_mapped().is_some() {
        return AddressScope::Other;
    }
    if (v6.segments()[0] & 0xffc0) == 0xfe80 {
        return AddressScope::LinkLocal;
    }
    if v6.is_loopback() {
        return AddressScope::Loopback;
    }
    if (v6.octets()[0] & 0xfe) == 0xfc {
        return AddressScope::UniqueLocal;
    }
    if v6.is_unspecified() || v6.is_multicast() {
        return AddressScope::Other;
    }

    AddressScope::GlobalUnicast
}

/// Pick the public IPv6 address among the addresses of `interface`
///
/// # Returns
///
/// - `Ok(Ipv6Addr)`: The first qualifying address
/// - `Err(Error::NoQualifyingAddress)`: None qualifies
pub fn select_public_ipv6<I>(interface: &str, addrs: I) -> Result<Ipv6Addr>
where
    I: IntoIterator<Item = IpAddr>,
{
    addrs
        .into_iter()
        .map(InterfaceAddress::new)
        .find_map(|a| a.public_ipv6())
        .ok_or_else(|| Error::no_qualifying_address(interface))
}
