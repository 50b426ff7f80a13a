//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML), optional
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → read once by main, handed to telemetry and the HTTP server
//! ```
//!
//! # Design Decisions
//! - Read once at startup; no reload
//! - All fields have defaults so the service runs without a file
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CollectorConfig, ExporterConfig, ListenerConfig, ObservabilityConfig, ServiceConfig,
    ServiceIdentityConfig, TimeoutConfig, WorkloadConfig,
};
pub use validation::{validate_config, ValidationError};
