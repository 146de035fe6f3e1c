//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject backends whose tag filter leaves no server
//! - Check policy names and their parameters
//! - Validate URLs and socket addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;
use url::Url;

use crate::config::schema::{
    BackendSpec, GatewayConfig, POLICIES, POLICY_HEADER_HASH,
};
use crate::load_balancer::pool::pick_servers;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{section}: servers_tags picks none of the servers")]
    EmptyServerPool { section: String },

    #[error("{section}: headerHash needs header_hash_key")]
    MissingHeaderHashKey { section: String },

    #[error("{section}: invalid header_hash_key {key:?}")]
    InvalidHeaderHashKey { section: String, key: String },

    #[error("{section}: unknown load balance policy {policy:?} (expected one of {expected})")]
    UnknownPolicy {
        section: String,
        policy: String,
        expected: String,
    },

    #[error("{section}: invalid server url {url:?}: {reason}")]
    InvalidServerUrl {
        section: String,
        url: String,
        reason: String,
    },

    #[error("{section}: tag {tag:?} is empty or duplicated")]
    InvalidTag { section: String, tag: String },

    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: String, value: String },
}

/// Validate the whole gateway configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_backend("backend", &config.backend);
    if let Some(mirror) = &config.mirror {
        errors.extend(validate_backend("mirror", mirror));
    }

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate one backend section, returning every problem found.
pub fn validate_backend(section: &str, spec: &BackendSpec) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    check_tags(&mut errors, section, &spec.servers_tags);
    for server in &spec.servers {
        check_tags(&mut errors, section, &server.tags);
        if let Err(reason) = check_url(&server.url) {
            errors.push(ValidationError::InvalidServerUrl {
                section: section.to_string(),
                url: server.url.clone(),
                reason,
            });
        }
    }

    if pick_servers(spec).is_empty() {
        errors.push(ValidationError::EmptyServerPool {
            section: section.to_string(),
        });
    }

    let lb = &spec.load_balance;
    if !POLICIES.contains(&lb.policy.as_str()) {
        errors.push(ValidationError::UnknownPolicy {
            section: section.to_string(),
            policy: lb.policy.clone(),
            expected: POLICIES.join(", "),
        });
    }
    if lb.policy == POLICY_HEADER_HASH {
        match lb.header_hash_key.as_deref() {
            None | Some("") => errors.push(ValidationError::MissingHeaderHashKey {
                section: section.to_string(),
            }),
            Some(key) if HeaderName::from_bytes(key.as_bytes()).is_err() => {
                errors.push(ValidationError::InvalidHeaderHashKey {
                    section: section.to_string(),
                    key: key.to_string(),
                })
            }
            Some(_) => {}
        }
    }

    errors
}

fn check_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme {other:?}")),
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}

fn check_tags(errors: &mut Vec<ValidationError>, section: &str, tags: &[String]) {
    let mut seen = HashSet::new();
    for tag in tags {
        if tag.is_empty() || !seen.insert(tag.as_str()) {
            errors.push(ValidationError::InvalidTag {
                section: section.to_string(),
                tag: tag.clone(),
            });
        }
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}
