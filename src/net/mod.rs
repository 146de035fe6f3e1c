//! Network layer subsystem: the outbound side.
//!
//! # Data Flow
//! ```text
//! Composition root (main / tests)
//!     → transport.rs (build one pooled client from TransportConfig)
//!     → tls.rs (client TLS config, verification optional)
//!     → Transport cloned into every Dispatcher
//!     → Dispatcher::send → pooled keep-alive connection → backend
//! ```
//!
//! # Design Decisions
//! - One client per process so every backend shares one connection pool
//! - Passed in explicitly instead of living in a global
//! - No request timeout: callers own cancellation by dropping the future

pub mod tls;
pub mod transport;

pub use transport::{Transport, TransportError};
