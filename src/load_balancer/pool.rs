//! Server pool selection.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Filter the configured servers by the backend's tag filter
//!
//! # Design Decisions
//! - Untagged deployments (no filter, no server tags) use every server
//! - Otherwise a server needs every filter tag to be picked
//! - The picked list is immutable and order-stable once built

use crate::config::schema::{BackendSpec, ServerConfig};

/// A single backend server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    /// Base URL the request path is appended to.
    pub url: String,
    /// Labels used only for filtering.
    pub tags: Vec<String>,
}

impl From<&ServerConfig> for Server {
    fn from(config: &ServerConfig) -> Self {
        Self {
            url: config.url.clone(),
            tags: config.tags.clone(),
        }
    }
}

impl Server {
    /// Return true if this server carries every tag in `required`.
    pub fn has_tags(&self, required: &[String]) -> bool {
        required.iter().all(|tag| self.tags.contains(tag))
    }
}

/// Pick the effective server pool of a backend spec.
pub fn pick_servers(spec: &BackendSpec) -> Vec<Server> {
    let servers = spec.servers.iter().map(Server::from);

    let server_has_tag = spec.servers.iter().any(|s| !s.tags.is_empty());
    if spec.servers_tags.is_empty() && !server_has_tag {
        return servers.collect();
    }

    servers
        .filter(|server| server.has_tags(&spec.servers_tags))
        .collect()
}
