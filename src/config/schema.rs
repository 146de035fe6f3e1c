//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Wire name of the round-robin policy.
pub const POLICY_ROUND_ROBIN: &str = "roundRobin";
/// Wire name of the random policy.
pub const POLICY_RANDOM: &str = "random";
/// Wire name of the client-IP hash policy.
pub const POLICY_IP_HASH: &str = "ipHash";
/// Wire name of the header hash policy.
pub const POLICY_HEADER_HASH: &str = "headerHash";

/// All accepted policy names.
pub const POLICIES: [&str; 4] = [
    POLICY_ROUND_ROBIN,
    POLICY_RANDOM,
    POLICY_IP_HASH,
    POLICY_HEADER_HASH,
];

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, mirror buffering).
    #[serde(default)]
    pub listener: ListenerConfig,

    /// Primary backend: every request is answered from one of its servers.
    pub backend: BackendSpec,

    /// Optional mirror backend receiving a fire-and-forget copy of each request.
    #[serde(default)]
    pub mirror: Option<BackendSpec>,

    /// Shared transport tuning.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Observability settings.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest request body buffered for mirroring, in bytes.
    pub mirror_body_limit: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            mirror_body_limit: 4 * 1024 * 1024,
        }
    }
}

/// Backend definition: candidate servers, tag filter and load balancing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BackendSpec {
    /// Tags a server must all carry to be eligible.
    #[serde(default)]
    pub servers_tags: Vec<String>,

    /// Configured servers, in order.
    pub servers: Vec<ServerConfig>,

    /// Load balancing policy.
    #[serde(default)]
    pub load_balance: LoadBalanceConfig,
}

/// One configured backend server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Base URL, e.g. "http://10.0.0.1:8080". The request path is appended verbatim.
    pub url: String,

    /// Labels used only for filtering.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Load balancing settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoadBalanceConfig {
    /// One of `roundRobin`, `random`, `ipHash`, `headerHash`.
    pub policy: String,

    /// Header whose value is hashed, only for `headerHash`.
    #[serde(default)]
    pub header_hash_key: Option<String>,
}

impl Default for LoadBalanceConfig {
    fn default() -> Self {
        Self {
            policy: POLICY_ROUND_ROBIN.to_string(),
            header_hash_key: None,
        }
    }
}

/// Tuning knobs for the shared transport client.
///
/// The idle pool sizing is what keeps connection setup off the hot path under
/// high request rates; lower it only for small deployments.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// TCP keep-alive interval in seconds.
    pub tcp_keepalive_secs: u64,

    /// Delay before racing the other address family, in milliseconds.
    pub happy_eyeballs_ms: u64,

    /// How long an idle pooled connection is kept, in seconds.
    pub pool_idle_timeout_secs: u64,

    /// Maximum idle connections kept per backend host.
    pub pool_max_idle_per_host: usize,

    /// Skip verification of backend certificates (east-west traffic).
    pub insecure_skip_verify: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            tcp_keepalive_secs: 60,
            happy_eyeballs_ms: 300,
            pool_idle_timeout_secs: 90,
            pool_max_idle_per_host: 512,
            insecure_skip_verify: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
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
