//! Server configuration.
//!
//! All runtime configuration comes from `WAYPOST_*` environment
//! variables; defaults are suitable for local development.

use std::path::PathBuf;
use std::time::Duration;

use waypost_core::Error;
use waypost_resolver::{CacheConfig, GovernanceOptions, ResolverOptions};

/// Result alias for configuration loading.
pub type Result<T> = std::result::Result<T, Error>;

/// Cache tuning from the environment.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Whether resolution results are cached.
    pub enabled: bool,
    /// Maximum cached entries.
    pub max_size: usize,
    /// Entry TTL in seconds.
    pub ttl_seconds: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 10_000,
            ttl_seconds: 300,
        }
    }
}

impl CacheSettings {
    /// Converts to the resolver crate's cache config.
    #[must_use]
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig {
            enabled: self.enabled,
            max_size: self.max_size,
            default_ttl: Duration::from_secs(self.ttl_seconds),
        }
    }
}

/// Telemetry tuning from the environment.
#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    /// Bounded queue capacity.
    pub queue_capacity: usize,
    /// Events per delivered batch.
    pub batch_size: usize,
    /// Flush interval in milliseconds.
    pub flush_interval_ms: u64,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            batch_size: 1_000,
            flush_interval_ms: 1_000,
        }
    }
}

impl TelemetrySettings {
    /// Converts to the core crate's telemetry config.
    #[must_use]
    pub fn to_telemetry_config(&self) -> waypost_core::TelemetryConfig {
        waypost_core::TelemetryConfig {
            queue_capacity: self.queue_capacity,
            batch_size: self.batch_size,
            flush_interval: Duration::from_millis(self.flush_interval_ms),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// Deprecation feature toggles from the environment.
#[derive(Debug, Clone)]
pub struct DeprecationSettings {
    /// Master switch for deprecation behavior.
    pub enabled: bool,
    /// Follow successor pointers during resolve.
    pub redirect_on_resolve: bool,
    /// Diff-and-audit reloads instead of plain swaps.
    pub validated_reload: bool,
    /// Default for refusing reloads with breaking changes.
    pub block_breaking_reload: bool,
}

impl Default for DeprecationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            redirect_on_resolve: true,
            validated_reload: true,
            block_breaking_reload: false,
        }
    }
}

impl DeprecationSettings {
    /// Converts to the resolver's read-path toggles.
    #[must_use]
    pub fn to_resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            deprecation_enabled: self.enabled,
            redirect_on_resolve: self.redirect_on_resolve,
        }
    }

    /// Converts to the governance controller's toggles.
    #[must_use]
    pub fn to_governance_options(&self) -> GovernanceOptions {
        GovernanceOptions {
            deprecation_enabled: self.enabled,
            validated_reload: self.validated_reload,
            block_breaking_reload: self.block_breaking_reload,
        }
    }
}

/// Configuration for the Waypost API server.
#[derive(Clone)]
pub struct Config {
    /// HTTP bind host.
    pub host: String,
    /// HTTP server port.
    pub port: u16,
    /// Enable debug mode (pretty logs).
    pub debug: bool,
    /// Bearer token for the submit lane. Generated when unset.
    pub submit_token: Option<String>,
    /// Bearer token for the approve lane. Generated when unset.
    pub approve_token: Option<String>,
    /// Legacy single write token granting both lanes when the split
    /// tokens are unset.
    pub write_token: Option<String>,
    /// Optional shared secret required to read `/metrics`.
    pub metrics_secret: Option<String>,
    /// Catalog definition file path.
    pub catalog_file: Option<PathBuf>,
    /// Resolution cache tuning.
    pub cache: CacheSettings,
    /// Telemetry tuning.
    pub telemetry: TelemetrySettings,
    /// Deprecation feature toggles.
    pub deprecation: DeprecationSettings,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Optional concurrency limit for handlers.
    pub concurrency_limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8400,
            debug: false,
            submit_token: None,
            approve_token: None,
            write_token: None,
            metrics_secret: None,
            catalog_file: None,
            cache: CacheSettings::default(),
            telemetry: TelemetrySettings::default(),
            deprecation: DeprecationSettings::default(),
            request_timeout_secs: 30,
            concurrency_limit: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("debug", &self.debug)
            .field("submit_token", &self.submit_token.as_ref().map(|_| "[REDACTED]"))
            .field("approve_token", &self.approve_token.as_ref().map(|_| "[REDACTED]"))
            .field("write_token", &self.write_token.as_ref().map(|_| "[REDACTED]"))
            .field("metrics_secret", &self.metrics_secret.as_ref().map(|_| "[REDACTED]"))
            .field("catalog_file", &self.catalog_file)
            .field("cache", &self.cache)
            .field("telemetry", &self.telemetry)
            .field("deprecation", &self.deprecation)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("concurrency_limit", &self.concurrency_limit)
            .finish()
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Supported env vars:
    /// - `WAYPOST_HOST`, `WAYPOST_PORT`
    /// - `WAYPOST_DEBUG`
    /// - `WAYPOST_SUBMIT_TOKEN`, `WAYPOST_APPROVE_TOKEN`,
    ///   `WAYPOST_WRITE_TOKEN` (legacy fallback for both lanes)
    /// - `WAYPOST_METRICS_SECRET`
    /// - `WAYPOST_CATALOG_FILE`
    /// - `WAYPOST_CACHE_ENABLED`, `WAYPOST_CACHE_MAX_SIZE`,
    ///   `WAYPOST_CACHE_TTL_SECONDS`
    /// - `WAYPOST_TELEMETRY_QUEUE_CAPACITY`,
    ///   `WAYPOST_TELEMETRY_BATCH_SIZE`,
    ///   `WAYPOST_TELEMETRY_FLUSH_INTERVAL_MS`
    /// - `WAYPOST_DEPRECATION_ENABLED`, `WAYPOST_REDIRECT_ON_RESOLVE`,
    ///   `WAYPOST_VALIDATED_RELOAD`, `WAYPOST_BLOCK_BREAKING_RELOAD`
    /// - `WAYPOST_REQUEST_TIMEOUT_SECS`, `WAYPOST_CONCURRENCY_LIMIT`
    ///
    /// # Errors
    ///
    /// Returns an error when a variable is present but unparsable.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = env_string("WAYPOST_HOST") {
            config.host = host;
        }
        if let Some(port) = env_parse::<u16>("WAYPOST_PORT")? {
            config.port = port;
        }
        if let Some(debug) = env_bool("WAYPOST_DEBUG")? {
            config.debug = debug;
        }
        config.submit_token = env_string("WAYPOST_SUBMIT_TOKEN");
        config.approve_token = env_string("WAYPOST_APPROVE_TOKEN");
        config.write_token = env_string("WAYPOST_WRITE_TOKEN");
        config.metrics_secret = env_string("WAYPOST_METRICS_SECRET");
        config.catalog_file = env_string("WAYPOST_CATALOG_FILE").map(PathBuf::from);

        if let Some(enabled) = env_bool("WAYPOST_CACHE_ENABLED")? {
            config.cache.enabled = enabled;
        }
        if let Some(max_size) = env_parse::<usize>("WAYPOST_CACHE_MAX_SIZE")? {
            config.cache.max_size = max_size;
        }
        if let Some(ttl) = env_parse::<u64>("WAYPOST_CACHE_TTL_SECONDS")? {
            config.cache.ttl_seconds = ttl;
        }

        if let Some(capacity) = env_parse::<usize>("WAYPOST_TELEMETRY_QUEUE_CAPACITY")? {
            config.telemetry.queue_capacity = capacity;
        }
        if let Some(batch) = env_parse::<usize>("WAYPOST_TELEMETRY_BATCH_SIZE")? {
            config.telemetry.batch_size = batch;
        }
        if let Some(interval) = env_parse::<u64>("WAYPOST_TELEMETRY_FLUSH_INTERVAL_MS")? {
            config.telemetry.flush_interval_ms = interval;
        }

        if let Some(enabled) = env_bool("WAYPOST_DEPRECATION_ENABLED")? {
            config.deprecation.enabled = enabled;
        }
        if let Some(redirect) = env_bool("WAYPOST_REDIRECT_ON_RESOLVE")? {
            config.deprecation.redirect_on_resolve = redirect;
        }
        if let Some(validated) = env_bool("WAYPOST_VALIDATED_RELOAD")? {
            config.deprecation.validated_reload = validated;
        }
        if let Some(block) = env_bool("WAYPOST_BLOCK_BREAKING_RELOAD")? {
            config.deprecation.block_breaking_reload = block;
        }

        if let Some(timeout) = env_parse::<u64>("WAYPOST_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout_secs = timeout;
        }
        config.concurrency_limit = env_parse::<usize>("WAYPOST_CONCURRENCY_LIMIT")?;

        Ok(config)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env_string(name) {
        None => Ok(None),
        Some(value) => value.parse::<T>().map(Some).map_err(|_| {
            Error::internal(format!("cannot parse environment variable {name}='{value}'"))
        }),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    match env_string(name).as_deref() {
        None => Ok(None),
        Some("1" | "true" | "yes" | "on") => Ok(Some(true)),
        Some("0" | "false" | "no" | "off") => Ok(Some(false)),
        Some(other) => Err(Error::internal(format!(
            "cannot parse environment variable {name}='{other}' as bool"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_tokens() {
        let config = Config {
            submit_token: Some("super-secret".into()),
            approve_token: Some("even-more-secret".into()),
            ..Config::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("even-more-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.port, 8400);
        assert!(config.cache.enabled);
        assert!(config.deprecation.enabled);
        assert!(!config.deprecation.block_breaking_reload);
    }
}
