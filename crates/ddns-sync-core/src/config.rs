//! Configuration types for the ddns-sync system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Longest accepted interval between two re-checks (one day)
pub const MAX_WATCH_DELAY_SECS: u64 = 86_400;

/// Largest accepted notification channel capacity
pub const MAX_NOTIFICATION_CAPACITY: usize = 1024;

/// Main ddns-sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Where the IP addresses come from
    pub ip_source: IpSourceConfig,

    /// Where the domain names come from
    pub domain_source: DomainSourceConfig,

    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Interval between two re-checks of each source (in seconds)
    #[serde(default = "default_watch_delay_secs")]
    pub watch_delay_secs: u64,

    /// Optional coordinator settings
    #[serde(default)]
    pub updater: UpdaterConfig,
}

impl SyncConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !(1..=MAX_WATCH_DELAY_SECS).contains(&self.watch_delay_secs) {
            return Err(crate::Error::config(format!(
                "Watch delay must be between 1 and {} seconds, got {}",
                MAX_WATCH_DELAY_SECS, self.watch_delay_secs
            )));
        }

        self.ip_source.validate()?;
        self.domain_source.validate()?;
        self.provider.validate()?;
        self.updater.validate()?;

        Ok(())
    }
}

/// IP source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpSourceConfig {
    /// Fixed list of addresses
    Static {
        /// The addresses, in the order they should be published
        ips: Vec<String>,
    },

    /// Public IP lookup service returning `{"ip": "..."}`
    Ipify {
        /// Lookup URL (defaults to the public ipify endpoint)
        #[serde(default)]
        url: Option<String>,
    },

    /// Custom IP resolver
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl IpSourceConfig {
    /// Validate the IP source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            IpSourceConfig::Static { ips } => {
                if ips.is_empty() {
                    return Err(crate::Error::config(
                        "Static IP source requires at least one address",
                    ));
                }
                Ok(())
            }
            IpSourceConfig::Ipify { url } => {
                if url.as_ref().is_some_and(|u| u.is_empty()) {
                    return Err(crate::Error::config("Ipify URL cannot be empty"));
                }
                Ok(())
            }
            IpSourceConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom IP source factory cannot be empty",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the IP source type name
    pub fn type_name(&self) -> &str {
        match self {
            IpSourceConfig::Static { .. } => "static",
            IpSourceConfig::Ipify { .. } => "ipify",
            IpSourceConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Domain source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainSourceConfig {
    /// Fixed list of domain names
    Static {
        /// The domains to keep up to date
        domains: Vec<String>,
    },

    /// Custom domain lister
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl DomainSourceConfig {
    /// Validate the domain source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            DomainSourceConfig::Static { domains } => {
                if domains.is_empty() {
                    return Err(crate::Error::config(
                        "Static domain source requires at least one domain",
                    ));
                }
                Ok(())
            }
            DomainSourceConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom domain source factory cannot be empty",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the domain source type name
    pub fn type_name(&self) -> &str {
        match self {
            DomainSourceConfig::Static { .. } => "static",
            DomainSourceConfig::Custom { factory, .. } => factory,
        }
    }
}

/// DNS provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Only log the updates that would be made
    #[default]
    Log,

    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// Zone ID (optional, can be auto-detected)
        zone_id: Option<String>,
        /// Perform reads only and log intended writes
        #[serde(default)]
        dry_run: bool,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Log => Ok(()),
            ProviderConfig::Cloudflare { api_token, .. } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Log => "log",
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Update coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Capacity of each listener → coordinator notification channel
    ///
    /// A listener blocks on send once its channel holds this many unconsumed
    /// notifications. 1 is the closest to an unbuffered channel and keeps the
    /// coordinator no more than one notification behind each listener.
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,
}

impl UpdaterConfig {
    /// Validate the coordinator configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !(1..=MAX_NOTIFICATION_CAPACITY).contains(&self.notification_capacity) {
            return Err(crate::Error::config(format!(
                "Notification capacity must be between 1 and {}, got {}",
                MAX_NOTIFICATION_CAPACITY, self.notification_capacity
            )));
        }
        Ok(())
    }
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            notification_capacity: default_notification_capacity(),
        }
    }
}

fn default_watch_delay_secs() -> u64 {
    5
}

fn default_notification_capacity() -> usize {
    1
}
