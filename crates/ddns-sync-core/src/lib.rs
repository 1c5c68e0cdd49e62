// # ddns-sync-core
//
// Core library keeping DNS A-records in sync with a changing set of public
// IP addresses and a changing set of domain names.
//
// ## Architecture Overview
//
// - **PollListener**: change detector, turns periodic or event-driven
//   "resolve current state" calls into change notifications
// - **Updater**: update coordinator, merges the latest IP set and the latest
//   domain set and issues one provider call per domain
// - **IpResolver / DomainLister**: data source traits
// - **DnsProvider**: sink trait applying an address list to a domain
// - **Registry**: plugin-based construction of sources and providers
//
// ```text
// IpResolver   → PollListener ─┐
//                              ├→ Updater → DnsProvider
// DomainLister → PollListener ─┘
// ```
//
// ## Design Principles
//
// 1. **Failure isolation**: resolve and update failures are logged and
//    skipped, they never stop a loop
// 2. **No shared mutable state**: listeners and the coordinator only talk
//    through channels
// 3. **Explicit collaborators**: loggers, providers and sources are passed in
//    at construction, there are no process-wide singletons

pub mod config;
pub mod error;
pub mod listener;
pub mod provider;
pub mod registry;
pub mod source;
pub mod traits;
pub mod updater;

// Re-export core types for convenience
pub use config::{DomainSourceConfig, IpSourceConfig, ProviderConfig, SyncConfig, UpdaterConfig};
pub use error::{Error, Result};
pub use listener::{PollListener, Ticks, event_ticks, interval_ticks, with_events};
pub use registry::Registry;
pub use traits::{DnsProvider, DomainLister, IpResolver, Listener, Logger, ObservableSet, Poll};
pub use updater::{Updater, UpdaterState};

// Cancellation token threaded through listeners and the coordinator
pub use tokio_util::sync::CancellationToken;
