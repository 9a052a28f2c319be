// # DNS Provider Trait
//
// Defines the interface for looking up and writing the single AAAA record
// managed by the updater.
//
// ## Implementations
//
// - Cloudflare: `ddns6-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns6_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//     let record = config.provider.record_spec();
//
//     let existing = provider.fetch_existing(&record).await?;
//     let id = provider
//         .upsert(&record, existing.as_ref().map(|r| &r.id), "2001:db8::1".parse()?)
//         .await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::fmt;
use std::net::Ipv6Addr;

/// Record type of every record this system manages
pub const RECORD_TYPE_AAAA: &str = "AAAA";

/// Provider-assigned opaque handle of an existing record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The parameters of the managed record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSpec {
    /// Zone holding the record
    pub zone_id: String,
    /// Fully qualified record name
    pub name: String,
    /// TTL in seconds (1 = automatic)
    pub ttl: u32,
    /// Whether the record is proxied
    pub proxied: bool,
}

impl RecordSpec {
    /// Record type (always AAAA)
    pub fn record_type(&self) -> &'static str {
        RECORD_TYPE_AAAA
    }
}

/// A record found by [`DnsProvider::fetch_existing`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingRecord {
    /// Identifier to address future updates
    pub id: RecordId,
    /// Published content, as returned by the provider
    pub content: String,
}

/// Trait for DNS provider implementations
///
/// # Contract
///
/// - **Single-shot**: exactly one API call per method invocation
/// - **No retries, no backoff**: failures are returned; the engine decides
///   whether another attempt happens (it waits for the next address change)
/// - **Stateless**: the record identifier is cached by the engine, not here
///
/// # Errors
///
/// - `Error::Api`: the provider answered `success=false` (any HTTP status);
///   the message concatenates the provider's error messages
/// - `Error::Transport`: the request could not be sent, or the response
///   could not be read or parsed
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Look up the managed record by name and type
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))`: The first matching record
    /// - `Ok(None)`: No such record; it will be created on the first update
    /// - `Err(Error)`: The lookup failed
    async fn fetch_existing(
        &self,
        record: &RecordSpec,
    ) -> Result<Option<ExistingRecord>, crate::Error>;

    /// Create the record (no `record_id`) or update it in place
    ///
    /// Both variants send the same body: type, name, content, ttl, proxied.
    ///
    /// # Returns
    ///
    /// The identifier of the written record (new on create, unchanged on
    /// update) for the engine to cache.
    async fn upsert(
        &self,
        record: &RecordSpec,
        record_id: Option<&RecordId>,
        address: Ipv6Addr,
    ) -> Result<RecordId, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
