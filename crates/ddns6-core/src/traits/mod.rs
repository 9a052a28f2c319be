//! Core traits for the IPv6 DDNS updater
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpSource`]: Read the public IPv6 address of an interface
//! - [`DnsProvider`]: Look up and write the managed AAAA record

pub mod ip_source;
pub mod dns_provider;

pub use ip_source::IpSource;
pub use dns_provider::{DnsProvider, ExistingRecord, RecordId, RecordSpec, RECORD_TYPE_AAAA};
