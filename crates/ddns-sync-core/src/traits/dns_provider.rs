// # DNS Provider Trait
//
// Defines the interface the update coordinator uses to apply an address list
// to one domain.
//
// ## Implementations
//
// - Log-only: `ddns_sync_core::provider::LogProvider`
// - Cloudflare: `ddns-sync-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_sync_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     provider
//         .update("www.example.com", &["203.0.113.7".to_string()])
//         .await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::sync::Arc;

use crate::traits::Logger;

/// Trait for DNS provider implementations
///
/// # Semantics
///
/// `update` is an upsert: after a successful call the domain resolves to
/// exactly `addresses`, whatever it resolved to before. The coordinator calls
/// it repeatedly with the same arguments, so it must be idempotent.
///
/// # Allowed
///
/// - Perform API calls to the provider's endpoints
/// - Return an error describing why the update failed
///
/// # Forbidden
///
/// - Retrying or sleeping (the next notification is the retry)
/// - Spawning tasks
/// - Caching state across calls
///
/// The coordinator logs every outcome and moves on to the next domain.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Replace the address records of `domain` with `addresses`
    ///
    /// # Parameters
    ///
    /// - `domain`: The fully qualified record name (e.g. "www.example.com")
    /// - `addresses`: The complete list of addresses, in source order
    async fn update(&self, domain: &str, addresses: &[String]) -> Result<(), crate::Error>;
}

#[async_trait]
impl<T: DnsProvider + ?Sized> DnsProvider for Box<T> {
    async fn update(&self, domain: &str, addresses: &[String]) -> Result<(), crate::Error> {
        (**self).update(domain, addresses).await
    }
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this provider
    /// - `logger`: Sink for providers that report through the log
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
        logger: Arc<dyn Logger>,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
