// # Static Sources
//
// Data sources returning a list fixed at construction time.
//
// Wrapped in a `PollListener`, a static source emits exactly once: the first
// resolve is always emitted and every later one is suppressed as unchanged.

use async_trait::async_trait;

use crate::config::{DomainSourceConfig, IpSourceConfig};
use crate::traits::{
    DomainLister, DomainListerFactory, IpResolver, IpResolverFactory, ObservableSet,
};
use crate::{Error, Result};

/// Resolver that always returns the same addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticResolver {
    ips: ObservableSet,
}

impl StaticResolver {
    /// Create a resolver returning `ips`
    pub fn new(ips: ObservableSet) -> Self {
        Self { ips }
    }
}

#[async_trait]
impl IpResolver for StaticResolver {
    async fn resolve(&self) -> Result<ObservableSet> {
        Ok(self.ips.clone())
    }
}

/// Lister that always returns the same domains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticLister {
    domains: ObservableSet,
}

impl StaticLister {
    /// Create a lister returning `domains`
    pub fn new(domains: ObservableSet) -> Self {
        Self { domains }
    }
}

#[async_trait]
impl DomainLister for StaticLister {
    async fn list(&self) -> Result<ObservableSet> {
        Ok(self.domains.clone())
    }
}

/// Factory for creating static resolvers
pub struct StaticResolverFactory;

impl IpResolverFactory for StaticResolverFactory {
    fn create(&self, config: &IpSourceConfig) -> Result<Box<dyn IpResolver>> {
        match config {
            IpSourceConfig::Static { ips } => Ok(Box::new(StaticResolver::new(ips.clone()))),
            _ => Err(Error::config("Invalid config for static IP source")),
        }
    }
}

/// Factory for creating static listers
pub struct StaticListerFactory;

impl DomainListerFactory for StaticListerFactory {
    fn create(&self, config: &DomainSourceConfig) -> Result<Box<dyn DomainLister>> {
        match config {
            DomainSourceConfig::Static { domains } => {
                Ok(Box::new(StaticLister::new(domains.clone())))
            }
            _ => Err(Error::config("Invalid config for static domain source")),
        }
    }
}
