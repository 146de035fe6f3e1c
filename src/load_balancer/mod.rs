//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! BackendSpec
//!     → pool.rs (filter servers by tags, once at construction)
//!     → Policy::from_config (closed set of strategies)
//!
//! Per request:
//!     → LoadBalancer::next_index(ctx, len)
//!         - round_robin.rs (shared atomic counter)
//!         - random.rs (process-wide seeded generator)
//!         - hash.rs (FNV-1a of client IP or of one header value)
//!     → index into the immutable server list
//! ```
//!
//! # Design Decisions
//! - Policies are an enum dispatched by one function, not a string switch
//! - Selection never takes a lock except the random generator's
//! - No health state: every picked server is always eligible

pub mod hash;
pub mod pool;
pub mod random;
pub mod round_robin;

use axum::http::HeaderName;

use crate::config::schema::{
    LoadBalanceConfig, POLICY_HEADER_HASH, POLICY_IP_HASH, POLICY_RANDOM, POLICY_ROUND_ROBIN,
};
use crate::dispatch::context::HttpContext;
use crate::load_balancer::round_robin::RoundRobin;

/// Load balancing policy with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    RoundRobin,
    Random,
    IpHash,
    HeaderHash { key: HeaderName },
}

impl Policy {
    /// Build the policy from its configuration.
    ///
    /// Validation rejects unknown names and missing header keys before this is
    /// reached; if it happens anyway the policy degrades to round-robin.
    pub fn from_config(config: &LoadBalanceConfig) -> Self {
        match config.policy.as_str() {
            POLICY_ROUND_ROBIN => Policy::RoundRobin,
            POLICY_RANDOM => Policy::Random,
            POLICY_IP_HASH => Policy::IpHash,
            POLICY_HEADER_HASH => {
                let key = config
                    .header_hash_key
                    .as_deref()
                    .and_then(|k| HeaderName::from_bytes(k.as_bytes()).ok());
                match key {
                    Some(key) => Policy::HeaderHash { key },
                    None => {
                        tracing::error!(
                            header_hash_key = ?config.header_hash_key,
                            "BUG: headerHash without a usable header key, falling back to roundRobin"
                        );
                        Policy::RoundRobin
                    }
                }
            }
            other => {
                tracing::error!(
                    policy = %other,
                    "BUG: unknown load balance policy, falling back to roundRobin"
                );
                Policy::RoundRobin
            }
        }
    }

    /// Wire name of the policy.
    pub fn name(&self) -> &'static str {
        match self {
            Policy::RoundRobin => POLICY_ROUND_ROBIN,
            Policy::Random => POLICY_RANDOM,
            Policy::IpHash => POLICY_IP_HASH,
            Policy::HeaderHash { .. } => POLICY_HEADER_HASH,
        }
    }
}

/// Per-backend selector: a policy plus the state round-robin needs.
#[derive(Debug)]
pub struct LoadBalancer {
    policy: Policy,
    round_robin: RoundRobin,
}

impl LoadBalancer {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            round_robin: RoundRobin::new(),
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Select an index in `[0, len)` for the request. `len` must be non-zero.
    pub fn next_index(&self, ctx: &dyn HttpContext, len: usize) -> usize {
        match &self.policy {
            Policy::RoundRobin => self.round_robin.next_index(len),
            Policy::Random => random::next_index(len),
            Policy::IpHash => hash::index_for(&ctx.real_ip(), len),
            Policy::HeaderHash { key } => {
                // A missing or non-UTF-8 header hashes like the empty string.
                let value = ctx
                    .headers()
                    .get(key)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("");
                hash::index_for(value, len)
            }
        }
    }
}
