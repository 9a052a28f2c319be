// # IP Source Trait
//
// Defines the interface for reading the host's public IPv6 address.
//
// ## Implementations
//
// - getifaddrs-based (Unix): `ddns6-ip-ifaddrs` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns6_core::IpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//
//     let address = source.current().await?;
//     println!("{} has {}", source.interface(), address);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv6Addr;

/// Trait for IP source implementations
///
/// A source is bound to one interface and answers a single question: which
/// address on that interface is the public-facing one right now.
///
/// # Contract
///
/// - Stateless: every call re-reads the interface
/// - No side effects: safe to call repeatedly, from the poll loop and from
///   the stability timer
/// - Selection follows [`crate::probe::select_public_ipv6`]
///
/// Sources are **observers**, not **decision-makers**: they never schedule,
/// retry or talk to the DNS provider.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current public IPv6 address of the interface
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv6Addr)`: The first qualifying address in enumeration order
    /// - `Err(Error::InterfaceNotFound)`: The interface does not exist
    /// - `Err(Error::NoQualifyingAddress)`: No public IPv6 address is bound
    async fn current(&self) -> Result<Ipv6Addr, crate::Error>;

    /// Name of the monitored interface (for logging)
    fn interface(&self) -> &str;
}
