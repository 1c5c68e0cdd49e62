// # Log Provider
//
// A DNS provider that only reports the updates it is asked to make.
// Useful for dry runs and for checking which domains a source produces.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ProviderConfig;
use crate::traits::{DnsProvider, DnsProviderFactory, Logger};
use crate::{Error, Result};

/// DNS provider writing each update to the injected logger
pub struct LogProvider {
    logger: Arc<dyn Logger>,
}

impl LogProvider {
    /// Create a provider logging through `logger`
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

#[async_trait]
impl DnsProvider for LogProvider {
    async fn update(&self, domain: &str, addresses: &[String]) -> Result<()> {
        self.logger.log(format_args!(
            "Update domain IPS: {}: {}",
            domain,
            addresses.join(", ")
        ));
        Ok(())
    }
}

/// Factory for creating log providers
pub struct LogProviderFactory;

impl DnsProviderFactory for LogProviderFactory {
    fn create(
        &self,
        config: &ProviderConfig,
        logger: Arc<dyn Logger>,
    ) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Log => Ok(Box::new(LogProvider::new(logger))),
            _ => Err(Error::config("Invalid config for log provider")),
        }
    }
}
