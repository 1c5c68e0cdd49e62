//! Plugin-based registry
//!
//! The registry maps type names to factories for IP resolvers, domain listers
//! and DNS providers, so that the daemon never hardcodes which
//! implementations exist.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ddns_sync_core::Registry;
//!
//! // Built-ins: "static" resolver, "static" lister, "log" provider
//! let registry = Registry::with_builtins();
//!
//! // Implementation crates register themselves
//! ddns_sync_ip_http::register(&registry);
//! ddns_sync_provider_cloudflare::register(&registry);
//!
//! // Wire everything from configuration
//! let updater = registry.build_updater(&config, logger)?;
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::config::{DomainSourceConfig, IpSourceConfig, ProviderConfig, SyncConfig};
use crate::error::{Error, Result};
use crate::listener::{PollListener, interval_ticks};
use crate::provider::LogProviderFactory;
use crate::source::{StaticListerFactory, StaticResolverFactory};
use crate::traits::{DnsProvider, DomainLister, IpResolver, Logger, TracingLogger};
use crate::traits::{DnsProviderFactory, DomainListerFactory, IpResolverFactory};
use crate::updater::Updater;

/// Registry for plugin-based construction of sources and providers
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct Registry {
    /// Registered IP resolver factories
    ip_resolvers: RwLock<HashMap<String, Box<dyn IpResolverFactory>>>,

    /// Registered domain lister factories
    domain_listers: RwLock<HashMap<String, Box<dyn DomainListerFactory>>>,

    /// Registered DNS provider factories
    providers: RwLock<HashMap<String, Box<dyn DnsProviderFactory>>>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in implementations
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_ip_resolver("static", Box::new(StaticResolverFactory));
        registry.register_domain_lister("static", Box::new(StaticListerFactory));
        registry.register_provider("log", Box::new(LogProviderFactory));
        registry
    }

    /// Register an IP resolver factory
    ///
    /// # Parameters
    ///
    /// - `name`: Resolver type name (e.g., "static", "ipify")
    /// - `factory`: Factory object for creating resolver instances
    pub fn register_ip_resolver(
        &self,
        name: impl Into<String>,
        factory: Box<dyn IpResolverFactory>,
    ) {
        let mut resolvers = self
            .ip_resolvers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        resolvers.insert(name.into(), factory);
    }

    /// Register a domain lister factory
    pub fn register_domain_lister(
        &self,
        name: impl Into<String>,
        factory: Box<dyn DomainListerFactory>,
    ) {
        let mut listers = self
            .domain_listers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        listers.insert(name.into(), factory);
    }

    /// Register a DNS provider factory
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use std::sync::Arc;
    /// # use ddns_sync_core::Registry;
    /// # use ddns_sync_core::traits::{DnsProviderFactory, Logger};
    /// # struct MyFactory;
    /// # impl DnsProviderFactory for MyFactory {
    /// #     fn create(&self, config: &ddns_sync_core::config::ProviderConfig, logger: Arc<dyn Logger>) -> ddns_sync_core::Result<Box<dyn ddns_sync_core::DnsProvider>> { unimplemented!() }
    /// # }
    /// let registry = Registry::new();
    /// registry.register_provider("myprovider", Box::new(MyFactory));
    /// ```
    pub fn register_provider(&self, name: impl Into<String>, factory: Box<dyn DnsProviderFactory>) {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        providers.insert(name.into(), factory);
    }

    /// Create an IP resolver from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn IpResolver>)`: Created resolver instance
    /// - `Err(Error)`: If the type is not registered or creation fails
    pub fn create_ip_resolver(&self, config: &IpSourceConfig) -> Result<Box<dyn IpResolver>> {
        let source_type = config.type_name();
        let resolvers = self
            .ip_resolvers
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = resolvers
            .get(source_type)
            .ok_or_else(|| Error::config(format!("Unknown IP source type: {}", source_type)))?;

        factory.create(config)
    }

    /// Create a domain lister from configuration
    pub fn create_domain_lister(
        &self,
        config: &DomainSourceConfig,
    ) -> Result<Box<dyn DomainLister>> {
        let source_type = config.type_name();
        let listers = self
            .domain_listers
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = listers
            .get(source_type)
            .ok_or_else(|| Error::config(format!("Unknown domain source type: {}", source_type)))?;

        factory.create(config)
    }

    /// Create a DNS provider from configuration
    pub fn create_provider(
        &self,
        config: &ProviderConfig,
        logger: Arc<dyn Logger>,
    ) -> Result<Box<dyn DnsProvider>> {
        let provider_type = config.type_name();
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);

        let factory = providers
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?;

        factory.create(config, logger)
    }

    /// Wire a complete [`Updater`] from configuration
    ///
    /// Both sources are wrapped in a [`PollListener`] re-checking every
    /// `watch_delay_secs`. Each listener logs through its own
    /// [`TracingLogger`]; the provider and the coordinator use `logger`.
    pub fn build_updater(&self, config: &SyncConfig, logger: Arc<dyn Logger>) -> Result<Updater> {
        config.validate()?;

        let delay = Duration::from_secs(config.watch_delay_secs);
        let resolver = self.create_ip_resolver(&config.ip_source)?;
        let lister = self.create_domain_lister(&config.domain_source)?;
        let provider = self.create_provider(&config.provider, logger.clone())?;

        let ip_listener = PollListener::from_resolver(
            interval_ticks(delay),
            Arc::new(TracingLogger::new("ip-listener")),
            resolver,
        );
        let domain_listener = PollListener::from_lister(
            interval_ticks(delay),
            Arc::new(TracingLogger::new("domain-listener")),
            lister,
        );

        Updater::new(
            provider,
            Box::new(ip_listener),
            Box::new(domain_listener),
            logger,
            config.updater.clone(),
        )
    }

    /// List all registered IP resolver types
    pub fn list_ip_resolvers(&self) -> Vec<String> {
        let resolvers = self
            .ip_resolvers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        resolvers.keys().cloned().collect()
    }

    /// List all registered domain lister types
    pub fn list_domain_listers(&self) -> Vec<String> {
        let listers = self
            .domain_listers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        listers.keys().cloned().collect()
    }

    /// List all registered provider types
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        providers.keys().cloned().collect()
    }

    /// Check if an IP resolver type is registered
    pub fn has_ip_resolver(&self, name: &str) -> bool {
        let resolvers = self
            .ip_resolvers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        resolvers.contains_key(name)
    }

    /// Check if a domain lister type is registered
    pub fn has_domain_lister(&self, name: &str) -> bool {
        let listers = self
            .domain_listers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        listers.contains_key(name)
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        providers.contains_key(name)
    }
}
