//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → handler (extract traceparent, open spans, run kernel)
//!     → "done\n"
//! ```

pub mod server;

pub use server::{build_router, AppState, HttpServer};
