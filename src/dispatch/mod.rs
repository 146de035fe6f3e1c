//! Backend dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! handle_with_response(ctx):
//!     cache hit? → done (cache already set the response)
//!     → load_balancer picks a server      → tag backendAddr
//!     → adaptor rewrites method/path/headers (in place)
//!     → Transport::send (body streamed)   → on error: 503 + tag backendErr
//!     → code counter + metrics            → tag backendCode
//!     → response status/headers/body (DurationBody) set on ctx
//!     → response-got callbacks, in order
//!     → adaptor rewrites the response
//!     → finish hook tags backendDuration (TTFB + body read time)
//!     → cache store
//!
//! handle_without_response(ctx):
//!     → pick server → adapt (copy) → send → count code
//!     → background task drains the body so the connection is reused
//! ```
//!
//! # Design Decisions
//! - No retries, no backoff: a failed call is reported, never repeated
//! - The status code and tags are the only failure outputs
//! - No per-request locking; the round-robin counter is a single atomic

pub mod body;
pub mod context;
pub mod dispatcher;
pub mod error;

pub use context::{AdaptedRequest, Adaptor, FinishFn, HttpContext, ResponseCache};
pub use dispatcher::{Dispatcher, ResponseGotFn};
pub use error::DispatchError;
