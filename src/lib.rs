//! HTTP backend dispatch for an API gateway.
//!
//! Selects one of a backend's servers by load balancing policy, forwards the
//! request over a shared pooled client, and records per-server status codes
//! and latency.

pub mod admin;
pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod net;
pub mod observability;

pub use config::schema::{BackendSpec, GatewayConfig};
pub use dispatch::{Dispatcher, HttpContext};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use net::Transport;
