//! HTTP front end subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all route)
//!     → context.rs (RequestContext wraps request + peer address)
//!     → [mirror dispatcher, spawned, on a buffered copy]
//!     → primary dispatcher (response set on the context)
//!     → RequestContext::into_response → client
//!     → finish hooks + access log once the body is dropped
//! ```

pub mod context;
pub mod server;

pub use context::RequestContext;
pub use server::{AppState, Dispatchers, HttpServer};
