// # ddns-syncd - DNS Sync Daemon
//
// Thin integration layer around ddns-sync-core. The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering IP sources and providers
// 4. Running the update coordinator until SIGINT/SIGTERM
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### IP Source
// - `DDNS_IP_SOURCE_TYPE`: `static` or `ipify` (default: ipify)
// - `DDNS_IP_STATIC_VALUES`: Comma-separated addresses (for static)
// - `DDNS_IP_IPIFY_URL`: Lookup endpoint (for ipify, optional)
//
// ### Domain Source
// - `DDNS_DOMAIN_SOURCE_TYPE`: `static` (default)
// - `DDNS_DOMAIN_STATIC_VALUES`: Comma-separated domain names
//
// ### DNS Provider
// - `DDNS_PROVIDER_TYPE`: `log` or `cloudflare` (default: log)
// - `DDNS_PROVIDER_API_TOKEN`: API token (for cloudflare)
// - `DDNS_PROVIDER_ZONE_ID`: Zone ID (optional)
// - `DDNS_MODE`: `dry-run` to only log provider writes
//
// ### Coordination
// - `DDNS_WATCH_DELAY_SECS`: Re-check interval of both sources (default: 5, max: 86400)
// - `DDNS_NOTIFICATION_CAPACITY`: Notification channel capacity (default: 1, max: 1024)
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn or error (default: info)
//
// ## Example
//
// ```bash
// export DDNS_IP_SOURCE_TYPE=ipify
// export DDNS_DOMAIN_STATIC_VALUES=example.com,www.example.com
// export DDNS_PROVIDER_TYPE=cloudflare
// export DDNS_PROVIDER_API_TOKEN=your_token
//
// ddns-syncd
// ```

use anyhow::{Context, Result};
use ddns_sync_core::config::{
    DomainSourceConfig, IpSourceConfig, MAX_NOTIFICATION_CAPACITY, MAX_WATCH_DELAY_SECS,
    ProviderConfig, SyncConfig, UpdaterConfig,
};
use ddns_sync_core::traits::{Logger, TracingLogger};
use ddns_sync_core::{CancellationToken, Registry, Updater};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// How long the coordinator gets to stop after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration, as read from the environment
#[derive(Debug, Clone)]
struct Config {
    ip_source_type: String,
    ip_static_values: Vec<String>,
    ip_ipify_url: Option<String>,
    domain_source_type: String,
    domain_static_values: Vec<String>,
    provider_type: String,
    provider_api_token: Option<String>,
    provider_zone_id: Option<String>,
    dry_run: bool,
    watch_delay_secs: u64,
    notification_capacity: usize,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            ip_source_type: non_empty("DDNS_IP_SOURCE_TYPE")
                .unwrap_or_else(|| "ipify".to_string()),
            ip_static_values: split_list(non_empty("DDNS_IP_STATIC_VALUES")),
            ip_ipify_url: non_empty("DDNS_IP_IPIFY_URL"),
            domain_source_type: non_empty("DDNS_DOMAIN_SOURCE_TYPE")
                .unwrap_or_else(|| "static".to_string()),
            domain_static_values: split_list(non_empty("DDNS_DOMAIN_STATIC_VALUES")),
            provider_type: non_empty("DDNS_PROVIDER_TYPE").unwrap_or_else(|| "log".to_string()),
            provider_api_token: non_empty("DDNS_PROVIDER_API_TOKEN"),
            provider_zone_id: non_empty("DDNS_PROVIDER_ZONE_ID"),
            dry_run: non_empty("DDNS_MODE").is_some_and(|m| m.eq_ignore_ascii_case("dry-run")),
            watch_delay_secs: parse_or(
                "DDNS_WATCH_DELAY_SECS",
                non_empty("DDNS_WATCH_DELAY_SECS"),
                5,
            )?,
            notification_capacity: parse_or(
                "DDNS_NOTIFICATION_CAPACITY",
                non_empty("DDNS_NOTIFICATION_CAPACITY"),
                1,
            )?,
            log_level: non_empty("DDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Checks what the environment alone can tell: known type names, values
    /// required by the selected types, numeric ranges and domain name syntax.
    fn validate(&self) -> Result<()> {
        match self.ip_source_type.as_str() {
            "static" => {
                if self.ip_static_values.is_empty() {
                    anyhow::bail!(
                        "DDNS_IP_STATIC_VALUES is required when DDNS_IP_SOURCE_TYPE=static. \
                        Set it via: export DDNS_IP_STATIC_VALUES=203.0.113.7"
                    );
                }
            }
            "ipify" => {
                if let Some(ref url) = self.ip_ipify_url
                    && !url.starts_with("https://")
                    && !url.starts_with("http://")
                {
                    anyhow::bail!(
                        "DDNS_IP_IPIFY_URL must use HTTP or HTTPS scheme. Got: {}",
                        url
                    );
                }
            }
            _ => anyhow::bail!(
                "DDNS_IP_SOURCE_TYPE '{}' is not supported. \
                Supported types: static, ipify",
                self.ip_source_type
            ),
        }

        match self.domain_source_type.as_str() {
            "static" => {
                if self.domain_static_values.is_empty() {
                    anyhow::bail!(
                        "DDNS_DOMAIN_STATIC_VALUES must contain at least one domain. \
                        Set it via: export DDNS_DOMAIN_STATIC_VALUES=example.com,www.example.com"
                    );
                }
                for domain in &self.domain_static_values {
                    validate_domain_name(domain)?;
                }
            }
            _ => anyhow::bail!(
                "DDNS_DOMAIN_SOURCE_TYPE '{}' is not supported. Supported types: static",
                self.domain_source_type
            ),
        }

        match self.provider_type.as_str() {
            "log" => {}
            "cloudflare" => {
                if self.provider_api_token.is_none() {
                    anyhow::bail!(
                        "DDNS_PROVIDER_API_TOKEN is required when DDNS_PROVIDER_TYPE=cloudflare. \
                        Set it via: export DDNS_PROVIDER_API_TOKEN=your_token"
                    );
                }
            }
            _ => anyhow::bail!(
                "DDNS_PROVIDER_TYPE '{}' is not supported. \
                Supported providers: log, cloudflare",
                self.provider_type
            ),
        }

        if !(1..=MAX_WATCH_DELAY_SECS).contains(&self.watch_delay_secs) {
            anyhow::bail!(
                "DDNS_WATCH_DELAY_SECS must be between 1 and {} seconds. Got: {}",
                MAX_WATCH_DELAY_SECS,
                self.watch_delay_secs
            );
        }

        if !(1..=MAX_NOTIFICATION_CAPACITY).contains(&self.notification_capacity) {
            anyhow::bail!(
                "DDNS_NOTIFICATION_CAPACITY must be between 1 and {}. Got: {}",
                MAX_NOTIFICATION_CAPACITY,
                self.notification_capacity
            );
        }

        parse_log_level(&self.log_level)?;
        Ok(())
    }

    /// Build the library configuration
    fn to_sync_config(&self) -> SyncConfig {
        let ip_source = match self.ip_source_type.as_str() {
            "static" => IpSourceConfig::Static {
                ips: self.ip_static_values.clone(),
            },
            _ => IpSourceConfig::Ipify {
                url: self.ip_ipify_url.clone(),
            },
        };

        let provider = match self.provider_type.as_str() {
            "cloudflare" => ProviderConfig::Cloudflare {
                api_token: self.provider_api_token.clone().unwrap_or_default(),
                zone_id: self.provider_zone_id.clone(),
                dry_run: self.dry_run,
            },
            _ => ProviderConfig::Log,
        };

        SyncConfig {
            ip_source,
            domain_source: DomainSourceConfig::Static {
                domains: self.domain_static_values.clone(),
            },
            provider,
            watch_delay_secs: self.watch_delay_secs,
            updater: UpdaterConfig {
                notification_capacity: self.notification_capacity,
            },
        }
    }
}

/// Split a comma-separated variable, dropping empty items
fn split_list(value: Option<String>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a numeric variable, falling back to `default` when unset
fn parse_or<T>(key: &str, value: Option<String>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number. Got: {}", key, v)),
        None => Ok(default),
    }
}

/// Map a log level name to a tracing level
fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "DDNS_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks; not comprehensive but catches common errors.
fn validate_domain_name(domain: &str) -> Result<()> {
    let name = domain.strip_suffix('.').unwrap_or(domain);
    if name.is_empty() {
        anyhow::bail!("Domain name cannot be empty");
    }

    if name.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            name.len(),
            domain
        );
    }

    for label in name.split('.') {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        // Wildcards are valid as a leading label
        if label == "*" {
            continue;
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric, hyphen and underscore only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

/// Registry with every implementation compiled into this binary
fn build_registry() -> Registry {
    let registry = Registry::with_builtins();

    #[cfg(feature = "http")]
    {
        info!("Registering ipify IP resolver");
        ddns_sync_ip_http::register(&registry);
    }

    #[cfg(feature = "cloudflare")]
    {
        info!("Registering Cloudflare provider");
        ddns_sync_provider_cloudflare::register(&registry);
    }

    registry
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = parse_log_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddns-syncd daemon");
    info!(
        "Configuration loaded: ip source {}, {} domain(s), provider {}",
        config.ip_source_type,
        config.domain_static_values.len(),
        config.provider_type
    );
    if config.dry_run {
        warn!("DDNS_MODE=dry-run: provider writes are only logged");
    }

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        // Wiring failures are configuration problems: unknown or disabled
        // types, invalid provider settings
        let registry = build_registry();
        let logger: Arc<dyn Logger> = Arc::new(TracingLogger::new("updater"));
        let updater = match registry.build_updater(&config.to_sync_config(), logger) {
            Ok(updater) => updater,
            Err(e) => {
                error!("Failed to build updater: {}", e);
                return DdnsExitCode::ConfigError;
            }
        };

        match run_daemon(updater).await {
            Ok(()) => DdnsExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DdnsExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Run the coordinator until a shutdown signal, then stop it
async fn run_daemon(updater: Updater) -> Result<()> {
    let cancel = CancellationToken::new();
    let mut task = tokio::spawn(updater.start(cancel.clone()));

    info!("Daemon initialized successfully");

    tokio::select! {
        received = wait_for_shutdown() => {
            info!("Received shutdown signal: {}", received?);
            cancel.cancel();

            let joined = tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut task)
                .await
                .map_err(|_| anyhow::anyhow!("Shutdown timeout after {:?}", SHUTDOWN_TIMEOUT))?;
            joined.context("updater task failed")??;
        }
        joined = &mut task => {
            warn!("Both sources stopped, exiting");
            joined.context("updater task failed")??;
        }
    }

    info!("Shutting down daemon");
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
