//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher produces, per forwarded call:
//!     → codes.rs (status code histogram per server, exported via admin API)
//!     → metrics.rs (Prometheus counters and histograms)
//!     → context tags (backendAddr, backendCode, backendDuration, ...)
//!
//! Everything else:
//!     → logging.rs (tracing subscriber; access log on request finish)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - The code counter is always on; Prometheus is optional
//! - Metrics are cheap (atomic increments)

pub mod codes;
pub mod logging;
pub mod metrics;
