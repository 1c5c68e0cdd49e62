//! Core traits for the ddns-sync system
//!
//! Every collaborator of the core is a small capability trait, so that data
//! sources, sinks and test doubles can be swapped without touching the
//! change detector or the update coordinator.
//!
//! - [`Poll`]: the zero-argument "resolve current state" operation
//! - [`IpResolver`] / [`DomainLister`]: sources of IP and domain sets
//! - [`DnsProvider`]: applies an address list to one domain
//! - [`Listener`]: produces full observable sets on change
//! - [`Logger`]: formatted-message sink

pub mod dns_provider;
pub mod listener;
pub mod logger;
pub mod poll;

pub use dns_provider::{DnsProvider, DnsProviderFactory};
pub use listener::Listener;
pub use logger::{Logger, TracingLogger};
pub use poll::{
    DomainLister, DomainListerFactory, IpResolver, IpResolverFactory, ObservableSet, Poll,
};
