//! # Application State
//!
//! [`AppConfig`] is read from the environment once at startup. [`AppState`]
//! owns the store handle and the services built on it; Axum clones it into
//! every handler.

use std::sync::Arc;

use certvault_core::DEFAULT_LINK_TTL_SECS;

use crate::middleware::metrics::ApiMetrics;
use crate::services::{AuditService, IssuanceService, LifecycleService, LinkService, VerificationService};
use crate::store::{CertificateStore, MemoryStore};

/// Application configuration.
///
/// Custom `Debug` redacts the `auth_token` to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Postgres URL. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    /// Static bearer token guarding write routes.
    /// If `None`, authentication is disabled.
    pub auth_token: Option<String>,
    /// Lifetime of verification links created without an explicit TTL.
    pub link_ttl_secs: u64,
    pub metrics_enabled: bool,
    /// Emit JSON log lines instead of the human-readable format.
    pub log_json: bool,
    /// Take the verifier address from `X-Forwarded-For`. Enable only behind
    /// a reverse proxy that overwrites the header.
    pub trust_proxy_headers: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("database_max_connections", &self.database_max_connections)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("link_ttl_secs", &self.link_ttl_secs)
            .field("metrics_enabled", &self.metrics_enabled)
            .field("log_json", &self.log_json)
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            database_url: None,
            database_max_connections: 10,
            auth_token: None,
            link_ttl_secs: DEFAULT_LINK_TTL_SECS,
            metrics_enabled: true,
            log_json: false,
            trust_proxy_headers: false,
        }
    }
}

impl AppConfig {
    /// Build configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            port: parse_or(&lookup, "PORT", defaults.port),
            database_url: non_empty("DATABASE_URL"),
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            auth_token: non_empty("AUTH_TOKEN"),
            link_ttl_secs: parse_or(&lookup, "LINK_TTL_SECS", defaults.link_ttl_secs),
            metrics_enabled: parse_or(
                &lookup,
                "CERTVAULT_METRICS_ENABLED",
                defaults.metrics_enabled,
            ),
            log_json: lookup("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(defaults.log_json),
            trust_proxy_headers: parse_or(
                &lookup,
                "TRUST_PROXY_HEADERS",
                defaults.trust_proxy_headers,
            ),
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment value");
            default
        }),
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn CertificateStore>,
    pub issuance: IssuanceService,
    pub verification: VerificationService,
    pub lifecycle: LifecycleService,
    pub links: LinkService,
    pub audit: AuditService,
    /// `None` when metrics are disabled.
    pub metrics: Option<ApiMetrics>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("store", &self.store.backend())
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl AppState {
    /// In-memory state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), Arc::new(MemoryStore::new()))
    }

    /// Wire services over the given store.
    pub fn with_config(config: AppConfig, store: Arc<dyn CertificateStore>) -> Self {
        let verification = VerificationService::new(store.clone());
        Self {
            issuance: IssuanceService::new(store.clone()),
            lifecycle: LifecycleService::new(store.clone()),
            links: LinkService::new(store.clone(), verification.clone(), config.link_ttl_secs),
            audit: AuditService::new(store.clone()),
            verification,
            metrics: config.metrics_enabled.then(ApiMetrics::new),
            store,
            config,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
