// # Public IP Lookup
//
// This crate provides an IP resolver asking a public lookup service which
// address the host appears to connect from.
//
// ## Protocol
//
// One `GET` per resolve. The service answers `200 OK` with a JSON body of the
// form `{"ip": "203.0.113.7"}`, which yields a one-element address set.
//
// ## Architecture
//
// The resolver does not poll by itself: it is wrapped in a `PollListener`,
// which owns the cadence and the change detection.

use ddns_sync_core::Registry;
use ddns_sync_core::config::IpSourceConfig;
use ddns_sync_core::traits::{IpResolver, IpResolverFactory, ObservableSet};
use ddns_sync_core::{Error, Result};

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

/// Default lookup endpoint
pub const IPIFY_URL: &str = "https://api.ipify.org?format=json";

/// Request timeout for a single lookup
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Body returned by the lookup service
#[derive(Debug, Deserialize)]
struct LookupResponse {
    ip: String,
}

/// Resolver returning the apparent public address of the host
#[derive(Debug, Clone)]
pub struct IpifyResolver {
    /// Lookup endpoint
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl IpifyResolver {
    /// Create a resolver using the default endpoint
    pub fn new() -> Self {
        Self::with_url(IPIFY_URL)
    }

    /// Create a resolver using a custom endpoint
    ///
    /// # Parameters
    ///
    /// - `url`: Endpoint answering `{"ip": "..."}` (e.g., a self-hosted ipify)
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// The lookup endpoint
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for IpifyResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IpResolver for IpifyResolver {
    async fn resolve(&self) -> Result<ObservableSet> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            Error::http(format!(
                "unable to resolve current public address from {}: {}",
                self.url, e
            ))
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::resolve(format!(
                "unable to resolve current public address, unexpected HTTP status {} from {}, expecting {}",
                status.as_u16(),
                self.url,
                StatusCode::OK.as_u16()
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            Error::http(format!(
                "unable to read lookup response from {}: {}",
                self.url, e
            ))
        })?;
        let lookup: LookupResponse = serde_json::from_slice(&body)?;

        tracing::debug!(url = %self.url, ip = %lookup.ip, "public address resolved");
        Ok(vec![lookup.ip])
    }
}

/// Factory for creating lookup resolvers
pub struct IpifyFactory;

impl IpResolverFactory for IpifyFactory {
    fn create(&self, config: &IpSourceConfig) -> Result<Box<dyn IpResolver>> {
        match config {
            IpSourceConfig::Ipify { url } => {
                let resolver = match url {
                    Some(url) => IpifyResolver::with_url(url.clone()),
                    None => IpifyResolver::new(),
                };
                Ok(Box::new(resolver))
            }
            _ => Err(Error::config("Invalid config for ipify IP source")),
        }
    }
}

/// Register the lookup resolver with a registry
pub fn register(registry: &Registry) {
    registry.register_ip_resolver("ipify", Box::new(IpifyFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio_test::{assert_err, assert_ok};

    /// Serve one canned HTTP response on a local port, return its URL
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            // Read until the end of the request headers
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{}/?format=json", addr)
    }

    #[tokio::test]
    async fn resolves_the_advertised_address() {
        let url = serve_once("200 OK", r#"{"ip":"127.0.0.1"}"#).await;
        let resolver = IpifyResolver::with_url(url);

        let ips = assert_ok!(resolver.resolve().await);
        assert_eq!(ips, vec!["127.0.0.1".to_string()]);
    }

    #[tokio::test]
    async fn unexpected_status_names_both_codes_and_the_url() {
        let url = serve_once("201 Created", r#"{"ip":"127.0.0.1"}"#).await;
        let resolver = IpifyResolver::with_url(url.clone());

        let err = assert_err!(resolver.resolve().await);
        let message = err.to_string();
        assert!(message.contains("201"), "{}", message);
        assert!(message.contains("200"), "{}", message);
        assert!(message.contains(&url), "{}", message);
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let url = serve_once("200 OK", "{").await;
        let resolver = IpifyResolver::with_url(url);

        let err = assert_err!(resolver.resolve().await);
        assert!(matches!(err, Error::Json(_)));
    }

    #[tokio::test]
    async fn unreachable_service_is_an_error() {
        // Bind then drop, so nothing listens on the port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let resolver = IpifyResolver::with_url(format!("http://{}/", addr));
        let err = assert_err!(resolver.resolve().await);
        assert!(matches!(err, Error::Http(_)));
    }

    #[test]
    fn factory_defaults_to_the_public_endpoint() {
        let resolver = IpifyResolver::default();
        assert_eq!(resolver.url(), IPIFY_URL);

        assert!(IpifyFactory.create(&IpSourceConfig::Ipify { url: None }).is_ok());
        assert!(
            IpifyFactory
                .create(&IpSourceConfig::Static { ips: vec![] })
                .is_err()
        );
    }

    #[test]
    fn register_adds_the_ipify_type() {
        let registry = Registry::with_builtins();
        register(&registry);
        assert!(registry.has_ip_resolver("ipify"));
    }
}
