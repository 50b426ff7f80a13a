//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the instrumented handlers
//! - Wire up middleware (access log, request timeout)
//! - Extract the caller's trace context from every request
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServiceConfig;
use crate::kernel::{invoke, Fibonacci, InputSource, Kernel, LimitPolicy, RandomInput};
use crate::observability::metrics;
use crate::telemetry::attributes::KeyValue;
use crate::telemetry::span::SpanKind;
use crate::telemetry::Telemetry;

pub const QUOTE_SPAN: &str = "gosrvc-quote";
const RESPONSE_BODY: &str = "done\n";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub telemetry: Telemetry,
    pub kernel: Arc<dyn Kernel>,
    pub inputs: Arc<dyn InputSource>,
    pub policy: LimitPolicy,
}

impl AppState {
    /// Fibonacci over random inputs, as configured.
    pub fn from_config(config: &ServiceConfig, telemetry: Telemetry) -> Self {
        Self {
            telemetry,
            kernel: Arc::new(Fibonacci),
            inputs: Arc::new(RandomInput::new(config.workload.max_input)),
            policy: LimitPolicy::new(config.workload.limit_every),
        }
    }
}

/// HTTP server for the instrumented service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ServiceConfig, state: AppState) -> Self {
        let request_timeout = Duration::from_secs(config.timeouts.request_secs);
        Self {
            router: build_router(state, request_timeout),
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then drain open connections.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/quote", get(quote_handler))
        .route("/calc", get(calc_handler))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

/// Opens a server span under the caller's context and runs the kernel in it.
async fn quote_handler(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let start = Instant::now();
    let parent = state.telemetry.propagator().extract(&headers);

    let mut span = state.telemetry.tracer().start_span(
        &parent,
        QUOTE_SPAN,
        SpanKind::Server,
        vec![
            KeyValue::new("http.method", "GET"),
            KeyValue::new("http.route", "/quote"),
        ],
    );
    let input = state.inputs.next_input();
    let _ = invoke(
        state.telemetry.tracer(),
        &span.context(),
        state.kernel.as_ref(),
        &state.policy,
        input,
    );
    if let Err(e) = span.end() {
        tracing::warn!(error = %e, "Server span closed twice");
    }

    tracing::debug!(
        trace_id = %span.context().trace_id(),
        input,
        "Quote served"
    );
    metrics::record_request("/quote", StatusCode::OK.as_u16(), start);
    (StatusCode::OK, RESPONSE_BODY)
}

/// Runs the kernel directly under the caller's context.
async fn calc_handler(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let start = Instant::now();
    let parent = state.telemetry.propagator().extract(&headers);

    let input = state.inputs.next_input();
    let _ = invoke(
        state.telemetry.tracer(),
        &parent,
        state.kernel.as_ref(),
        &state.policy,
        input,
    );

    metrics::record_request("/calc", StatusCode::OK.as_u16(), start);
    (StatusCode::OK, RESPONSE_BODY)
}
