//! Configuration types for the IPv6 DDNS updater
//!
//! The structure mirrors the YAML file layout:
//!
//! ```yaml
//! interface: eth0
//! poll_interval: 30
//! stability_delay: 5
//! cloudflare:
//!   api_token: "..."
//!   zone_id: "..."
//!   record_name: home.example.com
//!   ttl: 1
//!   proxied: false
//! ```
//!
//! Loading (files, environment) is the daemon's job; this module only holds
//! the types, their defaults and validation.

use crate::traits::RecordSpec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cloudflare's "automatic" TTL sentinel
pub const AUTOMATIC_TTL: u32 = 1;

/// Largest TTL Cloudflare accepts (one day)
const MAX_TTL: u32 = 86_400;

/// Longest poll interval and stability delay accepted (one day)
const MAX_TIMING_SECS: u64 = 86_400;

/// Linux limits interface names to IFNAMSIZ - 1 bytes
const MAX_INTERFACE_NAME_LEN: usize = 15;

/// Main DDNS configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DdnsConfig {
    /// Network interface to read the address from (e.g. "eth0")
    pub interface: String,

    /// Seconds between two polls of the interface
    pub poll_interval: u64,

    /// Seconds a new address must stay unchanged before DNS is updated
    pub stability_delay: u64,

    /// DNS provider settings
    #[serde(rename = "cloudflare")]
    pub provider: ProviderConfig,
}

impl DdnsConfig {
    /// Create a configuration for `interface` with default timings
    pub fn new(interface: impl Into<String>, provider: ProviderConfig) -> Self {
        Self {
            interface: interface.into(),
            provider,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interface.is_empty() {
            return Err(crate::Error::config("interface is required"));
        }

        if self.interface.len() > MAX_INTERFACE_NAME_LEN {
            return Err(crate::Error::config(format!(
                "interface name too long: {} chars (max {})",
                self.interface.len(),
                MAX_INTERFACE_NAME_LEN
            )));
        }

        if self.poll_interval == 0 || self.poll_interval > MAX_TIMING_SECS {
            return Err(crate::Error::config(format!(
                "poll_interval must be between 1 and {} seconds. Got: {}",
                MAX_TIMING_SECS, self.poll_interval
            )));
        }

        if self.stability_delay > MAX_TIMING_SECS {
            return Err(crate::Error::config(format!(
                "stability_delay must be at most {} seconds. Got: {}",
                MAX_TIMING_SECS, self.stability_delay
            )));
        }

        self.provider.validate()
    }

    /// Interval between polls
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    /// Stability window applied to every new candidate address
    pub fn stability_delay(&self) -> Duration {
        Duration::from_secs(self.stability_delay)
    }
}

impl Default for DdnsConfig {
    fn default() -> Self {
        Self {
            interface: String::new(),
            poll_interval: default_poll_interval(),
            stability_delay: default_stability_delay(),
            provider: ProviderConfig::default(),
        }
    }
}

/// Cloudflare record settings
///
/// The Debug implementation does NOT expose the API token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Cloudflare API token with Zone:DNS:Edit permission
    /// ⚠️ NEVER log this value
    pub api_token: String,

    /// Zone holding the record
    pub zone_id: String,

    /// Fully qualified record name (e.g. "home.example.com")
    pub record_name: String,

    /// Record TTL in seconds, [`AUTOMATIC_TTL`] for automatic
    pub ttl: u32,

    /// Whether the record is proxied through Cloudflare
    pub proxied: bool,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("record_name", &self.record_name)
            .field("ttl", &self.ttl)
            .field("proxied", &self.proxied)
            .finish()
    }
}

impl ProviderConfig {
    /// Create provider settings with automatic TTL and proxying disabled
    pub fn new(
        api_token: impl Into<String>,
        zone_id: impl Into<String>,
        record_name: impl Into<String>,
    ) -> Self {
        Self {
            api_token: api_token.into(),
            zone_id: zone_id.into(),
            record_name: record_name.into(),
            ..Self::default()
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.api_token.is_empty() {
            return Err(crate::Error::config("cloudflare.api_token is required"));
        }
        if self.zone_id.is_empty() {
            return Err(crate::Error::config("cloudflare.zone_id is required"));
        }
        if self.record_name.is_empty() {
            return Err(crate::Error::config("cloudflare.record_name is required"));
        }

        validate_domain_name(&self.record_name)?;

        if self.ttl == 0 || self.ttl > MAX_TTL {
            return Err(crate::Error::config(format!(
                "cloudflare.ttl must be between 1 (automatic) and {}. Got: {}",
                MAX_TTL, self.ttl
            )));
        }

        Ok(())
    }

    /// The per-record parameters handed to the DNS provider
    pub fn record_spec(&self) -> RecordSpec {
        RecordSpec {
            zone_id: self.zone_id.clone(),
            name: self.record_name.clone(),
            ttl: self.ttl,
            proxied: self.proxied,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            zone_id: String::new(),
            record_name: String::new(),
            ttl: AUTOMATIC_TTL,
            proxied: false,
        }
    }
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks: total length, label length, label characters.
fn validate_domain_name(domain: &str) -> Result<(), crate::Error> {
    let domain = domain.strip_suffix('.').unwrap_or(domain);

    if domain.len() > 253 {
        return Err(crate::Error::config(format!(
            "record name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(crate::Error::config(format!(
                "record name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(crate::Error::config(format!(
                "record name label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(crate::Error::config(format!(
                "record name label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(crate::Error::config(format!(
                "record name label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}

fn default_poll_interval() -> u64 {
    30
}

fn default_stability_delay() -> u64 {
    5
}
