//! Instrumented blackbox service library.

pub mod config;
pub mod error;
pub mod http;
pub mod kernel;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod telemetry;

pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use telemetry::Telemetry;
