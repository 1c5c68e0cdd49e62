//! Minimal embedding example for ddns-sync-core
//!
//! This example wires the change detectors and the update coordinator by
//! hand, with application-defined sources and provider. The coordinator
//! lifecycle is fully managed by the application.

use ddns_sync_core::listener::{PollListener, interval_ticks};
use ddns_sync_core::source::StaticLister;
use ddns_sync_core::traits::{DnsProvider, IpResolver, Logger, ObservableSet, TracingLogger};
use ddns_sync_core::{CancellationToken, Result, Updater, UpdaterConfig};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Resolver simulating an address change every few resolves
struct RotatingResolver {
    addresses: Vec<&'static str>,
    calls: AtomicUsize,
}

impl RotatingResolver {
    fn new(addresses: Vec<&'static str>) -> Self {
        Self {
            addresses,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl IpResolver for RotatingResolver {
    async fn resolve(&self) -> Result<ObservableSet> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.addresses[(call / 3) % self.addresses.len()];
        Ok(vec![current.to_string()])
    }
}

/// Provider counting the updates it receives
struct CountingProvider {
    updates: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl DnsProvider for CountingProvider {
    async fn update(&self, domain: &str, addresses: &[String]) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        println!("[Embedded] {} -> {}", domain, addresses.join(", "));
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("=== Embedded ddns-sync-core Example ===\n");

    let logger: Arc<dyn Logger> = Arc::new(TracingLogger::new("embedded"));
    let updates = Arc::new(AtomicUsize::new(0));

    // 1. Sources, each behind its own change detector
    let ip_listener = PollListener::from_resolver(
        interval_ticks(Duration::from_millis(50)),
        logger.clone(),
        RotatingResolver::new(vec!["192.0.2.1", "192.0.2.2"]),
    );
    let domain_listener = PollListener::from_lister(
        interval_ticks(Duration::from_millis(50)),
        logger.clone(),
        StaticLister::new(vec!["example.com".to_string(), "www.example.com".to_string()]),
    );

    // 2. Coordinator
    println!("1. Creating updater...");
    let updater = Updater::new(
        Box::new(CountingProvider {
            updates: updates.clone(),
        }),
        Box::new(ip_listener),
        Box::new(domain_listener),
        logger,
        UpdaterConfig::default(),
    )?;

    // 3. Run in background, stop with a token
    println!("2. Starting updater in background...");
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(updater.start(cancel.clone()));

    println!("3. Application does other work while addresses rotate\n");
    tokio::time::sleep(Duration::from_millis(400)).await;

    println!("\n4. Stopping updater...");
    cancel.cancel();
    handle.await??;

    println!("\n5. Updater stopped cleanly after {} update(s).", updates.load(Ordering::SeqCst));
    println!("\n=== Embedding Successful ===");
    println!("Key Points:");
    println!("- Coordinator lifecycle is fully controlled by the application");
    println!("- Only changes reach the provider");
    println!("- All components are custom (not ddns-syncd defaults)");

    Ok(())
}
