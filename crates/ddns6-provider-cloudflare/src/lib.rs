// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare DNS record client of the IPv6 DDNS
// updater.
//
// ## Behavior
//
// - One HTTP request per trait call (GET lookup, POST create, PUT update)
// - Full error propagation to the engine; NO retry, NO backoff
// - HTTP timeout configured (30 seconds)
// - Dry-run mode: lookups are real, writes are only logged
// - Stateless: the record id is cached by the engine, not here
//
// ## Error Mapping
//
// Every response body is read as a Cloudflare envelope
// (`{success, errors, result}`), whatever the HTTP status:
//
// - `success=false` → `Error::Api` with the error messages joined by ", "
// - unreachable endpoint, timeout, unreadable or unparsable body →
//   `Error::Transport`
//
// ## Security Requirements
//
// - API token NEVER appears in logs (bearer header only, redacted Debug)
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=AAAA&name=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use ddns6_core::config::ProviderConfig;
use ddns6_core::traits::{DnsProvider, ExistingRecord, RecordId, RecordSpec};
use ddns6_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::net::Ipv6Addr;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Record id reported for a record created in dry-run mode
pub const DRY_RUN_RECORD_ID: &str = "dry-run";

/// Envelope of every Cloudflare v4 response
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl<T> ApiResponse<T> {
    /// Provider messages joined for an `Error::Api`
    fn error_message(&self, status: reqwest::StatusCode) -> String {
        let messages: Vec<&str> = self
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .filter(|m| !m.is_empty())
            .collect();

        if messages.is_empty() {
            return format!("request failed with HTTP {}", status);
        }

        tracing::debug!(
            "Cloudflare error codes: {:?}",
            self.errors.iter().map(|e| e.code).collect::<Vec<_>>()
        );
        messages.join(", ")
    }
}

/// A DNS record as returned by Cloudflare (only the fields used here)
#[derive(Debug, Deserialize)]
struct DnsRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    content: String,
}

/// Body of the create and update requests
#[derive(Debug, Serialize)]
struct RecordBody<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: String,
    ttl: u32,
    proxied: bool,
}

impl<'a> RecordBody<'a> {
    fn new(record: &'a RecordSpec, address: Ipv6Addr) -> Self {
        Self {
            record_type: record.record_type(),
            name: &record.name,
            content: address.to_string(),
            ttl: record.ttl,
            proxied: record.proxied,
        }
    }
}

/// Cloudflare DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform the record lookup
/// - Log the intended POST/PUT request and payload
/// - **NOT** actually modify DNS records
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API root, overridable for tests
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform lookups but skip writes
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permission
    /// - `dry_run`: If true, perform lookups but skip writes
    ///
    /// # Errors
    ///
    /// - `Error::Config`: The token is empty or the HTTP client cannot be built
    pub fn new(api_token: impl Into<String>, dry_run: bool) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Create a provider from the record settings
    pub fn from_config(config: &ProviderConfig, dry_run: bool) -> Result<Self> {
        if dry_run {
            tracing::warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
        }
        Self::new(config.api_token.clone(), dry_run)
    }

    /// Point the provider at another API root (e.g. a mock server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn records_url(&self, zone_id: &str) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, zone_id)
    }

    fn record_url(&self, zone_id: &str, record_id: &RecordId) -> String {
        format!("{}/{}", self.records_url(zone_id), record_id)
    }

    /// Send an authenticated request and unwrap the response envelope
    ///
    /// `result` is optional in a successful envelope; callers that need it
    /// go through [`Self::send_expecting`].
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(reqwest::StatusCode, Option<T>)> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("Failed to read response (HTTP {}): {}", status, e)))?;

        let envelope: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            Error::transport(format!("Failed to parse response (HTTP {}): {}", status, e))
        })?;

        if !envelope.success {
            return Err(Error::api(envelope.error_message(status)));
        }

        Ok((status, envelope.result))
    }

    /// Like [`Self::send`], but a missing `result` is a transport error
    async fn send_expecting<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let (status, result) = self.send(request).await?;
        result.ok_or_else(|| {
            Error::transport(format!("Invalid response format (HTTP {}): missing result", status))
        })
    }

    fn log_dry_run(&self, method: &str, url: &str, body: &RecordBody<'_>) {
        tracing::info!(
            "[DRY-RUN] Would send {} request to {} with payload: {}",
            method,
            url,
            serde_json::to_string(body).unwrap_or_default()
        );
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// Look up the AAAA record by name
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?type=AAAA&name=home.example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn fetch_existing(&self, record: &RecordSpec) -> Result<Option<ExistingRecord>> {
        tracing::debug!(
            "Looking up record: {} (type: {})",
            record.name,
            record.record_type()
        );

        let request = self
            .client
            .get(self.records_url(&record.zone_id))
            .query(&[("type", record.record_type()), ("name", record.name.as_str())]);

        let records: Vec<DnsRecord> = self.send_expecting(request).await?;

        let Some(found) = records.into_iter().next() else {
            tracing::debug!("No {} record named {}", record.record_type(), record.name);
            return Ok(None);
        };

        let id = found.id.ok_or_else(|| {
            Error::transport("Invalid response format: record.id is missing")
        })?;

        tracing::debug!("Found record ID: {}", id);
        Ok(Some(ExistingRecord {
            id: RecordId::new(id),
            content: found.content,
        }))
    }

    /// Create the record, or update it in place when its id is known
    ///
    /// # API Calls
    ///
    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// PUT  /zones/:zone_id/dns_records/:record_id
    /// {"type":"AAAA","name":"...","content":"2001:db8::1","ttl":1,"proxied":false}
    /// ```
    async fn upsert(
        &self,
        record: &RecordSpec,
        record_id: Option<&RecordId>,
        address: Ipv6Addr,
    ) -> Result<RecordId> {
        let body = RecordBody::new(record, address);

        tracing::info!(
            "{} Cloudflare DNS record: {} -> {} [mode: {}]",
            if record_id.is_some() { "Updating" } else { "Creating" },
            record.name,
            address,
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        match record_id {
            Some(id) => {
                let url = self.record_url(&record.zone_id, id);
                if self.dry_run {
                    self.log_dry_run("PUT", &url, &body);
                    return Ok(id.clone());
                }

                // The id is already known: a successful update need not echo the record
                let (_, updated) = self
                    .send::<DnsRecord>(self.client.put(&url).json(&body))
                    .await?;
                Ok(updated
                    .and_then(|record| record.id)
                    .map(RecordId::new)
                    .unwrap_or_else(|| id.clone()))
            }
            None => {
                let url = self.records_url(&record.zone_id);
                if self.dry_run {
                    self.log_dry_run("POST", &url, &body);
                    return Ok(RecordId::new(DRY_RUN_RECORD_ID));
                }

                let created: DnsRecord = self
                    .send_expecting(self.client.post(&url).json(&body))
                    .await?;
                let id = created.id.ok_or_else(|| {
                    Error::transport("Invalid response format: created record has no id")
                })?;
                Ok(RecordId::new(id))
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}
