// # Interface Address IP Source
//
// This crate reads the public IPv6 address of one network interface with
// `getifaddrs(3)`.
//
// ## Behavior
//
// Every call re-enumerates the interface; nothing is cached. Addresses are
// collected in enumeration order and handed to
// [`ddns6_core::probe::select_public_ipv6`], which drops IPv4, link-local,
// loopback and unique-local addresses and returns the first survivor.
//
// ## Platform Support
//
// Unix only. On other platforms every read fails with `InterfaceNotFound`.

use ddns6_core::traits::IpSource;
use ddns6_core::{Error, Result};
use std::net::Ipv6Addr;

/// IP source reading the addresses bound to a network interface
#[derive(Debug, Clone)]
pub struct InterfaceIpSource {
    interface: String,
}

impl InterfaceIpSource {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
        }
    }
}

#[async_trait::async_trait]
impl IpSource for InterfaceIpSource {
    async fn current(&self) -> Result<Ipv6Addr> {
        let addrs = sys::interface_addresses(&self.interface)?;
        tracing::trace!("{} carries {} address(es)", self.interface, addrs.len());
        ddns6_core::probe::select_public_ipv6(&self.interface, addrs)
    }

    fn interface(&self) -> &str {
        &self.interface
    }
}

#[cfg(unix)]
mod sys {
    use ddns6_core::{Error, Result};
    use std::ffi::{CStr, CString};
    use std::io;
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    /// Addresses bound to `interface`, in enumeration order
    ///
    /// Fails with `InterfaceNotFound` if no interface has that name.
    pub(crate) fn interface_addresses(interface: &str) -> Result<Vec<IpAddr>> {
        let name = CString::new(interface).map_err(|_| Error::interface_not_found(interface))?;

        // SAFETY: `name` is a valid NUL-terminated string for the duration of the call
        if unsafe { libc::if_nametoindex(name.as_ptr()) } == 0 {
            return Err(Error::interface_not_found(interface));
        }

        let mut ifaddrs: *mut libc::ifaddrs = std::ptr::null_mut();

        // SAFETY:
        // - `ifaddrs` is a valid pointer to a null pointer, which getifaddrs will populate
        // - The returned list must be freed with freeifaddrs (done at end of function)
        let ret = unsafe { libc::getifaddrs(&mut ifaddrs) };
        if ret != 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }

        let mut addresses = Vec::new();
        let mut ifa = ifaddrs;
        while !ifa.is_null() {
            // SAFETY:
            // - `ifa` is checked to be non-null in the while condition
            // - The structure remains valid until freeifaddrs is called
            let entry = unsafe { &*ifa };
            ifa = entry.ifa_next;

            if entry.ifa_name.is_null() || entry.ifa_addr.is_null() {
                continue;
            }

            // SAFETY: `ifa_name` is non-null and NUL-terminated, valid until freeifaddrs
            let entry_name = unsafe { CStr::from_ptr(entry.ifa_name) };
            if entry_name.to_bytes() != interface.as_bytes() {
                continue;
            }

            // SAFETY: `ifa_addr` is checked non-null above; only sa_family is read
            let family = unsafe { (*entry.ifa_addr).sa_family } as i32;

            let addr = match family {
                libc::AF_INET => {
                    let sin = entry.ifa_addr as *const libc::sockaddr_in;
                    // SAFETY: sa_family == AF_INET guarantees a sockaddr_in
                    let raw = unsafe { (*sin).sin_addr.s_addr };
                    IpAddr::V4(Ipv4Addr::from(u32::from_be(raw)))
                }
                libc::AF_INET6 => {
                    let sin6 = entry.ifa_addr as *const libc::sockaddr_in6;
                    // SAFETY: sa_family == AF_INET6 guarantees a sockaddr_in6
                    let raw = unsafe { (*sin6).sin6_addr.s6_addr };
                    IpAddr::V6(Ipv6Addr::from(raw))
                }
                // AF_PACKET / AF_LINK entries carry no IP
                _ => continue,
            };

            addresses.push(addr);
        }

        // SAFETY: `ifaddrs` was returned by a successful getifaddrs and is freed once
        unsafe { libc::freeifaddrs(ifaddrs) };

        Ok(addresses)
    }
}

#[cfg(not(unix))]
mod sys {
    use ddns6_core::{Error, Result};
    use std::net::IpAddr;

    pub(crate) fn interface_addresses(interface: &str) -> Result<Vec<IpAddr>> {
        Err(Error::interface_not_found(interface))
    }
}

/// Whether an interface with this name exists on the host
pub fn interface_exists(interface: &str) -> bool {
    !matches!(
        sys::interface_addresses(interface),
        Err(Error::InterfaceNotFound(_))
    )
}
