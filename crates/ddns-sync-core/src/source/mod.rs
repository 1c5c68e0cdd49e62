//! Built-in data sources
//!
//! - [`StaticResolver`]: fixed list of IP addresses
//! - [`StaticLister`]: fixed list of domain names

mod static_list;

pub use static_list::{StaticLister, StaticListerFactory, StaticResolver, StaticResolverFactory};
