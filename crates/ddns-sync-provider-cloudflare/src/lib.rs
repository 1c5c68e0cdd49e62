// # Cloudflare DNS Provider
//
// This crate provides a Cloudflare DNS provider for ddns-sync.
//
// ## Semantics
//
// `update(domain, addresses)` is an upsert: afterwards the A records of the
// domain hold exactly the IPv4 addresses of the list, and its AAAA records
// exactly the IPv6 ones. An address family absent from the list is left
// untouched.
//
// Per family, existing records are reconciled against the desired addresses:
//
// - a record already holding a desired address is kept
// - a surplus record is re-pointed (PUT) to a missing address
// - missing addresses left over are created (POST)
// - surplus records left over are deleted (DELETE)
//
// ## Constraints
//
// - One pass of API calls per `update`, no retries, no background tasks
// - The API token never appears in logs or in `Debug` output
// - Dry-run mode performs the reads and only logs the intended writes
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&type=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use ddns_sync_core::Registry;
use ddns_sync_core::config::ProviderConfig;
use ddns_sync_core::traits::{DnsProvider, DnsProviderFactory, Logger};
use ddns_sync_core::{Error, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Address record type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    Aaaa,
}

impl RecordType {
    /// Record type of an address
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => RecordType::A,
            IpAddr::V6(_) => RecordType::Aaaa,
        }
    }

    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }
}

/// An existing address record, as listed by the API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DnsRecord {
    /// Record identifier
    pub id: String,

    /// Record value (the address)
    pub content: String,

    /// TTL in seconds, 1 meaning automatic
    #[serde(default)]
    pub ttl: Option<u32>,

    /// Whether traffic is proxied through Cloudflare
    #[serde(default)]
    pub proxied: Option<bool>,
}

/// One write needed to reconcile a family
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordChange {
    /// Re-point an existing record to another address
    Repoint {
        /// The record to modify
        record: DnsRecord,
        /// Its new address
        address: IpAddr,
    },
    /// Create a new record
    Create {
        /// The address of the new record
        address: IpAddr,
    },
    /// Delete a record
    Delete {
        /// The record to remove
        record: DnsRecord,
    },
}

/// Compute the writes turning `existing` into exactly `desired`
///
/// Records whose content already matches a desired address are kept. Each
/// desired address is matched by at most one record, so duplicates count as
/// surplus. Surplus records are re-pointed before anything is created, and
/// whatever surplus remains is deleted.
pub fn plan_changes(existing: &[DnsRecord], desired: &[IpAddr]) -> Vec<RecordChange> {
    let mut missing: Vec<IpAddr> = Vec::new();
    for address in desired {
        if !missing.contains(address) {
            missing.push(*address);
        }
    }

    let mut surplus = Vec::new();
    for record in existing {
        let current = record.content.parse::<IpAddr>().ok();
        match current.and_then(|ip| missing.iter().position(|m| *m == ip)) {
            Some(index) => {
                missing.remove(index);
            }
            None => surplus.push(record.clone()),
        }
    }

    let mut surplus = surplus.into_iter();
    let mut changes = Vec::new();
    for address in missing {
        match surplus.next() {
            Some(record) => changes.push(RecordChange::Repoint { record, address }),
            None => changes.push(RecordChange::Create { address }),
        }
    }
    changes.extend(surplus.map(|record| RecordChange::Delete { record }));
    changes
}

/// Candidate zone names for a record name, longest first
///
/// `a.b.example.com` yields `a.b.example.com`, `b.example.com`, `example.com`.
/// Single-label names yield nothing.
pub fn zone_candidates(domain: &str) -> Vec<&str> {
    let domain = domain.trim_end_matches('.');
    let mut candidates = Vec::new();
    let mut rest = domain;
    while rest.contains('.') {
        candidates.push(rest);
        match rest.split_once('.') {
            Some((_, tail)) => rest = tail,
            None => break,
        }
    }
    candidates
}

/// Response envelope shared by every Cloudflare API call
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
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

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
}

/// Cloudflare DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zone lookup, record listing)
/// - Log the intended POST/PUT/DELETE calls
/// - **NOT** modify any DNS record
///
/// # Security
///
/// The Debug implementation does NOT expose the API token.
pub struct CloudflareProvider {
    /// Cloudflare API token
    api_token: String,

    /// Zone ID (optional, looked up from the record name otherwise)
    zone_id: Option<String>,

    /// API base URL
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: reads only, writes are logged
    dry_run: bool,
}

impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `zone_id`: Optional zone ID (looked up per domain otherwise)
    /// - `dry_run`: If true, perform reads but skip writes
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: If the token is empty
    pub fn new(
        api_token: impl Into<String>,
        zone_id: Option<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            zone_id,
            api_base: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Use another API endpoint (e.g., a local mock)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether writes are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Send a request and decode the `result` of the envelope
    async fn call<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<Option<T>> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::provider("cloudflare", format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status.as_u16(), context, &error_text));
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| {
            Error::provider("cloudflare", format!("{}: failed to parse response: {}", context, e))
        })?;

        if !envelope.success {
            let errors: Vec<String> = envelope
                .errors
                .iter()
                .map(|e| format!("{} ({})", e.message, e.code))
                .collect();
            return Err(Error::provider(
                "cloudflare",
                format!("{}: {}", context, errors.join(", ")),
            ));
        }

        Ok(envelope.result)
    }

    /// Get the zone ID for a record name
    ///
    /// If zone_id is set, returns it directly. Otherwise, asks for each
    /// candidate zone from the longest suffix down and keeps the first
    /// match.
    async fn get_zone_id(&self, domain: &str) -> Result<String> {
        if let Some(ref zone_id) = self.zone_id {
            tracing::debug!("Using pre-configured zone ID");
            return Ok(zone_id.clone());
        }

        let candidates = zone_candidates(domain);
        if candidates.is_empty() {
            return Err(Error::invalid_input(format!("Invalid domain name: {}", domain)));
        }

        for name in candidates {
            tracing::debug!("Looking up zone ID for: {}", name);
            let request = self
                .client
                .get(format!("{}/zones", self.api_base))
                .query(&[("name", name)]);
            let zones: Vec<Zone> = self
                .call(request, "zone lookup")
                .await?
                .unwrap_or_default();

            if let Some(zone) = zones.into_iter().next() {
                tracing::debug!("Found zone ID {} for {}", zone.id, name);
                return Ok(zone.id);
            }
        }

        Err(Error::not_found(format!("No zone found for {}", domain)))
    }

    /// List the records of one type for a name
    async fn list_records(
        &self,
        zone_id: &str,
        domain: &str,
        record_type: RecordType,
    ) -> Result<Vec<DnsRecord>> {
        let request = self
            .client
            .get(format!("{}/zones/{}/dns_records", self.api_base, zone_id))
            .query(&[("name", domain), ("type", record_type.as_str())]);
        Ok(self.call(request, "record lookup").await?.unwrap_or_default())
    }

    /// Apply one change, or log it in dry-run mode
    async fn apply_change(
        &self,
        zone_id: &str,
        domain: &str,
        record_type: RecordType,
        change: &RecordChange,
    ) -> Result<()> {
        let records_url = format!("{}/zones/{}/dns_records", self.api_base, zone_id);

        let (request, context) = match change {
            RecordChange::Repoint { record, address } => {
                let payload = serde_json::json!({
                    "type": record_type.as_str(),
                    "name": domain,
                    "content": address.to_string(),
                    "ttl": record.ttl.unwrap_or(1),
                    "proxied": record.proxied.unwrap_or(false),
                });
                if self.dry_run {
                    tracing::info!(
                        "[DRY-RUN] Would re-point {} record {} of {}: {} -> {}",
                        record_type.as_str(),
                        record.id,
                        domain,
                        record.content,
                        address
                    );
                    return Ok(());
                }
                let url = format!("{}/{}", records_url, record.id);
                (self.client.put(url).json(&payload), "record update")
            }
            RecordChange::Create { address } => {
                let payload = serde_json::json!({
                    "type": record_type.as_str(),
                    "name": domain,
                    "content": address.to_string(),
                    "ttl": 1,
                });
                if self.dry_run {
                    tracing::info!(
                        "[DRY-RUN] Would create {} record {} -> {}",
                        record_type.as_str(),
                        domain,
                        address
                    );
                    return Ok(());
                }
                (self.client.post(&records_url).json(&payload), "record creation")
            }
            RecordChange::Delete { record } => {
                if self.dry_run {
                    tracing::info!(
                        "[DRY-RUN] Would delete {} record {} of {} ({})",
                        record_type.as_str(),
                        record.id,
                        domain,
                        record.content
                    );
                    return Ok(());
                }
                let url = format!("{}/{}", records_url, record.id);
                (self.client.delete(url), "record deletion")
            }
        };

        self.call::<serde_json::Value>(request, context).await?;
        Ok(())
    }
}

/// Map an unsuccessful HTTP status to an error
fn status_error(status: u16, context: &str, body: &str) -> Error {
    match status {
        401 | 403 => Error::provider(
            "cloudflare",
            format!(
                "{}: authentication failed, invalid API token or insufficient permissions (status {})",
                context, status
            ),
        ),
        404 => Error::not_found(format!("{}: not found (status {})", context, status)),
        409 => Error::provider(
            "cloudflare",
            format!("{}: conflicting change in progress (status {})", context, status),
        ),
        429 => Error::provider(
            "cloudflare",
            format!("{}: rate limit exceeded (status {})", context, status),
        ),
        500..=599 => Error::provider(
            "cloudflare",
            format!("{}: server error (status {}): {}", context, status, body),
        ),
        _ => Error::provider(
            "cloudflare",
            format!("{}: failed (status {}): {}", context, status, body),
        ),
    }
}

/// Parse and group addresses by family, keeping source order
fn group_by_family(addresses: &[String]) -> Result<Vec<(RecordType, Vec<IpAddr>)>> {
    let mut v4 = Vec::new();
    let mut v6 = Vec::new();
    for address in addresses {
        let ip: IpAddr = address
            .trim()
            .parse()
            .map_err(|_| Error::invalid_input(format!("Invalid IP address: {}", address)))?;
        match RecordType::of(&ip) {
            RecordType::A => v4.push(ip),
            RecordType::Aaaa => v6.push(ip),
        }
    }

    let mut families = Vec::new();
    if !v4.is_empty() {
        families.push((RecordType::A, v4));
    }
    if !v6.is_empty() {
        families.push((RecordType::Aaaa, v6));
    }
    Ok(families)
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// Reconcile the A/AAAA records of `domain` to `addresses`
    ///
    /// # API Calls
    ///
    /// ```http
    /// # Zone lookup, unless a zone ID is configured
    /// GET /zones?name=example.com
    ///
    /// # Per family present in `addresses`
    /// GET /zones/:zone_id/dns_records?name=www.example.com&type=A
    ///
    /// # Writes (skipped in dry-run mode)
    /// PUT    /zones/:zone_id/dns_records/:record_id
    /// POST   /zones/:zone_id/dns_records
    /// DELETE /zones/:zone_id/dns_records/:record_id
    /// ```
    async fn update(&self, domain: &str, addresses: &[String]) -> Result<()> {
        if addresses.is_empty() {
            return Err(Error::invalid_input(format!(
                "Refusing to update {} with an empty address list",
                domain
            )));
        }
        let families = group_by_family(addresses)?;

        tracing::info!(
            "Updating Cloudflare DNS records: {} -> [{}] [mode: {}]",
            domain,
            addresses.join(","),
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        let zone_id = self.get_zone_id(domain).await?;

        for (record_type, desired) in families {
            let existing = self.list_records(&zone_id, domain, record_type).await?;
            let changes = plan_changes(&existing, &desired);

            if changes.is_empty() {
                tracing::debug!(
                    "{} records of {} already up to date",
                    record_type.as_str(),
                    domain
                );
                continue;
            }

            for change in &changes {
                self.apply_change(&zone_id, domain, record_type, change).await?;
            }
        }

        Ok(())
    }
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(
        &self,
        config: &ProviderConfig,
        _logger: Arc<dyn Logger>,
    ) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Cloudflare {
                api_token,
                zone_id,
                dry_run,
            } => {
                if *dry_run {
                    tracing::warn!(
                        "Cloudflare provider running in DRY-RUN mode - no changes will be made"
                    );
                }

                let provider =
                    CloudflareProvider::new(api_token.clone(), zone_id.clone(), *dry_run)?;
                Ok(Box::new(provider))
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use ddns_sync_core::Registry;
///
/// let registry = Registry::with_builtins();
/// ddns_sync_provider_cloudflare::register(&registry);
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &Registry) {
    registry.register_provider("cloudflare", Box::new(CloudflareFactory));
}
