// # Poll, IpResolver and DomainLister Traits
//
// Defines the "resolve current state" operations consumed by the change
// detector.
//
// ## Implementations
//
// - Static lists: `ddns_sync_core::source`
// - Public IP lookup: `ddns-sync-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_sync_core::traits::IpResolver;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let resolver = /* IpResolver implementation */;
//
//     let ips = resolver.resolve().await?;
//     println!("current addresses: {}", ips.join(","));
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// The ordered sequence of strings (addresses or domain names) produced by a
/// data source at a point in time.
///
/// Equality is positional: two sets are equal only if they hold the same
/// elements in the same order. A source that reorders unchanged elements
/// therefore produces a new notification.
pub type ObservableSet = Vec<String>;

/// Zero-argument operation returning the current state of a data source
///
/// This is the only operation the change detector needs. It may block on
/// I/O and may be called at any cadence.
///
/// # Contract
///
/// - Always return the whole current set, never a delta
/// - Return an error when the current value cannot be produced; the caller
///   logs it and tries again on the next tick
/// - Do not retry internally and do not sleep; the trigger source owns timing
#[async_trait]
pub trait Poll: Send + Sync {
    /// Resolve the current set
    async fn poll(&self) -> Result<ObservableSet, crate::Error>;
}

/// Source of the IP addresses the DNS records should point to
#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Resolve the addresses the DNS records should resolve to
    async fn resolve(&self) -> Result<ObservableSet, crate::Error>;
}

/// Source of the domain names whose records must be kept up to date
#[async_trait]
pub trait DomainLister: Send + Sync {
    /// List all domain names that require the current addresses
    async fn list(&self) -> Result<ObservableSet, crate::Error>;
}

/// Adapts an [`IpResolver`] to the [`Poll`] contract
pub(crate) struct ResolverPoll<R>(pub(crate) R);

#[async_trait]
impl<R: IpResolver> Poll for ResolverPoll<R> {
    async fn poll(&self) -> Result<ObservableSet, crate::Error> {
        self.0.resolve().await
    }
}

/// Adapts a [`DomainLister`] to the [`Poll`] contract
pub(crate) struct ListerPoll<L>(pub(crate) L);

#[async_trait]
impl<L: DomainLister> Poll for ListerPoll<L> {
    async fn poll(&self) -> Result<ObservableSet, crate::Error> {
        self.0.list().await
    }
}

/// Helper trait for constructing IP resolvers from configuration
pub trait IpResolverFactory: Send + Sync {
    /// Create an IpResolver instance from configuration
    fn create(
        &self,
        config: &crate::config::IpSourceConfig,
    ) -> Result<Box<dyn IpResolver>, crate::Error>;
}

/// Helper trait for constructing domain listers from configuration
pub trait DomainListerFactory: Send + Sync {
    /// Create a DomainLister instance from configuration
    fn create(
        &self,
        config: &crate::config::DomainSourceConfig,
    ) -> Result<Box<dyn DomainLister>, crate::Error>;
}

#[async_trait]
impl<T: IpResolver + ?Sized> IpResolver for Box<T> {
    async fn resolve(&self) -> Result<ObservableSet, crate::Error> {
        (**self).resolve().await
    }
}

#[async_trait]
impl<T: DomainLister + ?Sized> DomainLister for Box<T> {
    async fn list(&self) -> Result<ObservableSet, crate::Error> {
        (**self).list().await
    }
}
