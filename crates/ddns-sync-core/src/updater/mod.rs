//! Update coordinator
//!
//! The [`Updater`] merges the latest IP set and the latest domain set and
//! turns every change on either side into one provider call per domain.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐                          ┌──────────────┐
//! │ IP listener  │── ObservableSet ──┐      │ DnsProvider  │
//! └──────────────┘                   ▼      └──────────────┘
//!                             ┌─────────────┐      ▲
//!                             │   Updater   │──────┘ update(domain, ips)
//!                             └─────────────┘
//! ┌──────────────┐                   ▲
//! │ Domain lstnr │── ObservableSet ──┘
//! └──────────────┘
//! ```
//!
//! ## Event Flow
//!
//! 1. Each listener runs in its own task, feeding its own channel
//! 2. The dispatch loop takes whichever notification is ready first
//! 3. The received set replaces the previous one for that side
//! 4. Once both sides are known, every domain is updated with the full IP set,
//!    sequentially and in domain order
//!
//! A failed provider call is logged and does not stop the pass: the next
//! domain is still attempted, and the next notification triggers a fresh pass.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::UpdaterConfig;
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, Listener, Logger, ObservableSet};

/// What the coordinator knows so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdaterState {
    /// Neither IPs nor domains are known
    Uninitialized,
    /// Exactly one of IPs and domains is known
    PartiallyKnown,
    /// Both are known; every notification triggers an apply pass
    Ready,
}

/// Coordinator-local merge state
///
/// Each side is replaced wholesale by every notification; partial sets are
/// never merged.
#[derive(Debug, Default)]
struct Records {
    ips: Option<ObservableSet>,
    domains: Option<ObservableSet>,
}

impl Records {
    fn state(&self) -> UpdaterState {
        match (&self.ips, &self.domains) {
            (Some(_), Some(_)) => UpdaterState::Ready,
            (None, None) => UpdaterState::Uninitialized,
            _ => UpdaterState::PartiallyKnown,
        }
    }

    /// Domains and IPs, once both are known
    fn ready(&self) -> Option<(&[String], &[String])> {
        match (&self.domains, &self.ips) {
            (Some(domains), Some(ips)) => Some((domains, ips)),
            _ => None,
        }
    }
}

/// What the dispatch loop woke up for
enum Wakeup {
    Ips(Option<ObservableSet>),
    Domains(Option<ObservableSet>),
    Shutdown,
}

/// Merge-and-dispatch coordinator
///
/// ## Lifecycle
///
/// 1. Create with [`Updater::new()`]
/// 2. Run with [`Updater::start()`]
/// 3. The loop runs until the token is cancelled or both listeners stop
///
/// ## Threading
///
/// The merge state is owned by the dispatch loop alone; listeners only talk
/// to it through their channels, so no locking is involved.
pub struct Updater {
    /// DNS provider receiving one call per domain
    provider: Box<dyn DnsProvider>,

    /// Source of IP address sets
    ip_listener: Box<dyn Listener>,

    /// Source of domain name sets
    domain_listener: Box<dyn Listener>,

    /// Sink for per-domain outcomes
    logger: Arc<dyn Logger>,

    /// Capacity of each notification channel
    notification_capacity: usize,
}

impl Updater {
    /// Create a new coordinator
    ///
    /// # Returns
    ///
    /// - `Ok(Updater)`: Ready to start
    /// - `Err(Error::Config)`: If `config` is invalid
    pub fn new(
        provider: Box<dyn DnsProvider>,
        ip_listener: Box<dyn Listener>,
        domain_listener: Box<dyn Listener>,
        logger: Arc<dyn Logger>,
        config: UpdaterConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            provider,
            ip_listener,
            domain_listener,
            logger,
            notification_capacity: config.notification_capacity,
        })
    }

    /// Run the coordinator
    ///
    /// Spawns both listeners and dispatches their notifications until
    /// `cancel` fires or both listeners have stopped. When one listener stops,
    /// the last set it delivered stays in effect.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: A listener task panicked
    pub async fn start(self, cancel: CancellationToken) -> Result<()> {
        let Self {
            provider,
            mut ip_listener,
            mut domain_listener,
            logger,
            notification_capacity,
        } = self;

        let (ips_tx, mut ips_rx) = mpsc::channel(notification_capacity);
        let (domains_tx, mut domains_rx) = mpsc::channel(notification_capacity);

        let listeners = cancel.child_token();
        let ip_task = tokio::spawn({
            let token = listeners.clone();
            async move { ip_listener.listen(ips_tx, token).await }
        });
        let domain_task = tokio::spawn({
            let token = listeners.clone();
            async move { domain_listener.listen(domains_tx, token).await }
        });

        let mut records = Records::default();
        let mut ips_open = true;
        let mut domains_open = true;

        while ips_open || domains_open {
            let wakeup = tokio::select! {
                _ = cancel.cancelled() => Wakeup::Shutdown,
                received = ips_rx.recv(), if ips_open => Wakeup::Ips(received),
                received = domains_rx.recv(), if domains_open => Wakeup::Domains(received),
            };

            let previous = records.state();
            match wakeup {
                Wakeup::Shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                Wakeup::Ips(Some(ips)) => {
                    debug!("IP notification: [{}]", ips.join(","));
                    records.ips = Some(ips);
                }
                Wakeup::Domains(Some(domains)) => {
                    debug!("Domain notification: [{}]", domains.join(","));
                    records.domains = Some(domains);
                }
                Wakeup::Ips(None) => {
                    debug!("IP listener stopped");
                    ips_open = false;
                    continue;
                }
                Wakeup::Domains(None) => {
                    debug!("Domain listener stopped");
                    domains_open = false;
                    continue;
                }
            }

            let current = records.state();
            if current != previous {
                info!("Updater state: {:?} -> {:?}", previous, current);
            }

            if let Some((domains, ips)) = records.ready() {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Shutdown signal received during apply pass");
                        break;
                    }
                    _ = apply(&*provider, &*logger, domains, ips) => {}
                }
            }
        }

        listeners.cancel();
        let (ip_result, domain_result) = tokio::join!(ip_task, domain_task);
        for result in [ip_result, domain_result] {
            if let Err(e) = result
                && e.is_panic()
            {
                return Err(Error::Other(format!("listener task panicked: {}", e)));
            }
        }

        info!("Updater stopped");
        Ok(())
    }
}

/// One apply pass: update every domain with the full IP set, in order
async fn apply(
    provider: &dyn DnsProvider,
    logger: &dyn Logger,
    domains: &[String],
    ips: &[String],
) {
    for domain in domains {
        match provider.update(domain, ips).await {
            Ok(()) => {
                logger.log(format_args!("updated domain {} with IPs {}", domain, ips.join(",")));
            }
            Err(e) => {
                logger.log(format_args!("error: failed to update domain {}: {}", domain, e));
            }
        }
    }
}
