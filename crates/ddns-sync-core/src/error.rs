//! Error types for the ddns-sync system
//!
//! Errors raised inside the change detector or the update coordinator are
//! always recovered locally (logged, then skipped). Only configuration errors
//! are allowed to be fatal, and only at bootstrap.

use thiserror::Error;

/// Result type alias for ddns-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the ddns-sync system
#[derive(Error, Debug)]
pub enum Error {
    /// A data source could not produce its current value
    #[error("resolve error: {0}")]
    Resolve(String),

    /// DNS provider-related errors
    #[error("DNS provider error: {0}")]
    DnsProvider(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP errors (from lookup services and provider APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Record or zone not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Provider-specific error
    #[error("provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a resolve error
    pub fn resolve(msg: impl Into<String>) -> Self {
        Self::Resolve(msg.into())
    }

    /// Create a DNS provider error
    pub fn dns_provider(msg: impl Into<String>) -> Self {
        Self::DnsProvider(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_names_the_provider() {
        let err = Error::provider("cloudflare", "zone lookup failed");
        assert_eq!(
            err.to_string(),
            "provider error (cloudflare): zone lookup failed"
        );
    }

    #[test]
    fn anyhow_errors_keep_their_message() {
        let err: Error = anyhow::anyhow!("boom").into();
        assert!(matches!(err, Error::Other(ref m) if m == "boom"));
    }
}
