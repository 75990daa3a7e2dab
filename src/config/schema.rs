//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Client-affinity balancing settings.
    pub affinity: AffinityConfig,

    /// Route definitions mapping requests to targets.
    pub routes: Vec<RouteConfig>,

    /// Statically declared service instances.
    pub services: Vec<ServiceConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,
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

/// Client-affinity ("IP hash") balancing settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AffinityConfig {
    /// Scheme (or scheme prefix) that opts a route into IP hash balancing.
    pub scheme: String,

    /// Logical services that get an IP hash balancer bound.
    pub services: Vec<String>,

    /// Answer 404 when a pool is empty; 503 otherwise.
    pub use_404: bool,

    /// Upper bound on a single instance-list fetch, in milliseconds.
    pub discovery_timeout_ms: u64,

    /// Take the client key from the first X-Forwarded-For entry when present.
    pub trust_forwarded_for: bool,
}

impl Default for AffinityConfig {
    fn default() -> Self {
        Self {
            scheme: "iphash".to_string(),
            services: Vec::new(),
            use_404: true,
            discovery_timeout_ms: 5_000,
            trust_forwarded_for: false,
        }
    }
}

/// Route configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Host header to match (exact match).
    pub host: Option<String>,

    /// Path prefix to match.
    pub path_prefix: Option<String>,

    /// Target URI, e.g. `iphash://orders`, `iphash:https://orders`
    /// or a direct `http://10.0.0.9:8080`.
    pub uri: String,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,
}

/// A logical service and its declared instances.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Logical service name.
    pub name: String,

    /// Instances, in selection order.
    #[serde(default)]
    pub instances: Vec<InstanceConfig>,
}

/// One declared service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InstanceConfig {
    /// Instance identifier, unique within the service.
    pub id: String,

    pub host: String,

    pub port: u16,

    /// Native scheme (default: http).
    #[serde(default = "default_scheme")]
    pub scheme: String,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

fn default_scheme() -> String {
    "http".to_string()
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
