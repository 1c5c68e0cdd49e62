// # Cloudflare Reconcile Tool
//
// One-shot tool running a single `update` of the Cloudflare provider against
// the real API, then a second identical one to check idempotency.
//
// ## Usage
//
// ```bash
// # Dry-run mode (default - safe)
// CLOUDFLARE_API_TOKEN=your_token \
// DDNS_RECORD_NAME=ddns-test.example.com \
// DDNS_ADDRESSES=203.0.113.7,2001:db8::7 \
// cargo run --bin cloudflare_reconcile
//
// # Live mode (makes actual changes!)
// DDNS_MODE=live \
// CLOUDFLARE_API_TOKEN=your_token \
// DDNS_RECORD_NAME=ddns-test.example.com \
// DDNS_ADDRESSES=203.0.113.7 \
// cargo run --bin cloudflare_reconcile
// ```
//
// ## Environment Variables
//
// Required:
// - `CLOUDFLARE_API_TOKEN`: Cloudflare API token
// - `DDNS_RECORD_NAME`: Full record name (e.g., "ddns-test.example.com")
// - `DDNS_ADDRESSES`: Comma-separated addresses the record should hold
//
// Optional:
// - `CLOUDFLARE_ZONE_ID`: Zone ID (if not provided, will auto-discover)
// - `DDNS_MODE`: "dry-run" or "live" (default: dry-run)

use anyhow::{Context, Result};
use ddns_sync_core::traits::DnsProvider;
use ddns_sync_provider_cloudflare::CloudflareProvider;
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let api_token = env::var("CLOUDFLARE_API_TOKEN")
        .context("CLOUDFLARE_API_TOKEN environment variable is required")?;
    let zone_id = env::var("CLOUDFLARE_ZONE_ID").ok();
    let record_name = env::var("DDNS_RECORD_NAME")
        .context("DDNS_RECORD_NAME environment variable is required")?;
    let addresses: Vec<String> = env::var("DDNS_ADDRESSES")
        .context("DDNS_ADDRESSES environment variable is required")?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let mode = env::var("DDNS_MODE").unwrap_or_else(|_| "dry-run".to_string());
    let dry_run = !mode.eq_ignore_ascii_case("live");

    if dry_run {
        tracing::warn!("Running in DRY-RUN mode - no changes will be made");
    } else {
        tracing::warn!("Running in LIVE mode - will make actual DNS changes!");
    }

    tracing::info!("Record: {}", record_name);
    tracing::info!("Addresses: {}", addresses.join(", "));
    match zone_id {
        Some(ref zid) => tracing::info!("Zone ID: {}", zid),
        None => tracing::info!("Zone ID: (auto-discover)"),
    }

    let provider = CloudflareProvider::new(api_token, zone_id, dry_run)?;
    tracing::info!("Provider created: {:?}", provider);

    tracing::info!("--- Reconciling ---");
    provider
        .update(&record_name, &addresses)
        .await
        .context("first update failed")?;

    // With the records in place, the second pass must not write anything
    tracing::info!("--- Reconciling again (expecting no writes) ---");
    provider
        .update(&record_name, &addresses)
        .await
        .context("second update failed")?;

    if dry_run {
        tracing::info!("Dry run complete: no changes were made to DNS records");
    } else {
        tracing::info!("Live run complete: records of {} updated", record_name);
    }

    Ok(())
}
