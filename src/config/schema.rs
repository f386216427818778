//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so a minimal (or absent) config file works.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream target and same-origin prefix.
    pub upstream: UpstreamConfig,

    /// Rate limiting for proxied requests.
    pub rate_limit: RateLimitConfig,

    /// Static site serving.
    pub site: SiteConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream target configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Same-origin path prefix under which proxied traffic is routed.
    pub proxy_prefix: String,

    /// Base URL for proxied HTTP requests.
    pub http_base: String,

    /// Base URL for bridged WebSocket connections.
    pub ws_base: String,

    /// Header carrying the credential on upstream HTTP requests.
    pub credential_header: String,

    /// Query parameter carrying the credential on upstream WS upgrades.
    pub credential_query_param: String,

    /// Total time allowed for a plain (non-upgrade) proxied exchange, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            proxy_prefix: "/proxy".to_string(),
            http_base: "https://generativelanguage.googleapis.com".to_string(),
            ws_base: "wss://generativelanguage.googleapis.com".to_string(),
            credential_header: "x-goog-api-key".to_string(),
            credential_query_param: "key".to_string(),
            request_timeout_secs: 300,
        }
    }
}

impl UpstreamConfig {
    /// Host component of the upstream HTTP base, used by the interceptors
    /// to decide whether a request targets the upstream at all.
    pub fn upstream_host(&self) -> Option<String> {
        url::Url::parse(&self.http_base)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting on proxy routes.
    pub enabled: bool,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Maximum requests per client IP per window.
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 15 * 60,
            max_requests: 100,
        }
    }
}

/// Static site configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Directory served for non-proxy paths.
    pub root: String,

    /// HTML entry point, relative to `root`.
    pub index: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: "public".to_string(),
            index: "index.html".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
