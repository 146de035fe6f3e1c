//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → dispatchers built from its backend specs
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → new dispatchers built and swapped in atomically
//!     → old dispatchers dropped once in-flight requests finish
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - Sections other than `backend` have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, BackendSpec, GatewayConfig, ListenerConfig, LoadBalanceConfig,
    ObservabilityConfig, ServerConfig, TransportConfig,
};
pub use validation::ValidationError;
