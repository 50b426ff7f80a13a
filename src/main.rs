//! Instrumented blackbox service.
//!
//! Every request to `/quote` or `/calc` runs a small computation inside a
//! trace span tree that continues the caller's W3C trace context. Finished
//! spans are batched and shipped to an OTLP/HTTP collector in the background.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request (traceparent)
//!     ────────────────────────────▶ http::server ──▶ telemetry::propagation
//!                                        │
//!                                        ▼
//!                                   server span ──▶ kernel::invoke ──▶ "process" span
//!                                        │                                  │
//!     "done\n" ◀─────────────────────────┘                                  ▼
//!                                                  telemetry::exporter (queue → batch → OTLP)
//!                                                                           │
//!                                                                           ▼
//!                                                                  remote collector
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use blackbox_service::config::{load_config, ServiceConfig};
use blackbox_service::http::{AppState, HttpServer};
use blackbox_service::lifecycle::{wait_for_signal, Shutdown};
use blackbox_service::observability::{init_logging, init_metrics};
use blackbox_service::telemetry::Telemetry;

#[derive(Parser)]
#[command(name = "blackbox-service", version, about = "Instrumented blackbox service")]
struct Args {
    /// TOML configuration file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    init_logging(&config.observability)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "blackbox-service starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        collector = %config.collector.endpoint,
        service = %config.service.name,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let telemetry = Telemetry::init(&config);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    let state = AppState::from_config(&config, telemetry.clone());
    let server = HttpServer::new(&config, state);
    server.run(listener, shutdown_rx).await?;

    let deadline = Duration::from_millis(config.exporter.shutdown_timeout_ms);
    if let Err(e) = telemetry.shutdown(deadline).await {
        tracing::warn!(error = %e, "Span pipeline did not drain cleanly");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
