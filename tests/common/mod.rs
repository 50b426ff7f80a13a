//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Router,
};
use prost::Message;
use tokio::net::TcpListener;

use blackbox_service::http::{build_router, AppState};
use blackbox_service::kernel::{Fibonacci, InputSource, LimitPolicy};
use blackbox_service::telemetry::exporter::InMemorySpanExporter;
use blackbox_service::telemetry::{BatchConfig, Resource, Telemetry};
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;

/// One request as seen by the mock collector.
#[derive(Debug, Clone)]
pub struct Captured {
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl Captured {
    pub fn decode(&self) -> ExportTraceServiceRequest {
        ExportTraceServiceRequest::decode(self.body.as_ref()).unwrap()
    }

    /// Names of every span in the request.
    pub fn span_names(&self) -> Vec<String> {
        self.decode()
            .resource_spans
            .iter()
            .flat_map(|rs| rs.scope_spans.iter())
            .flat_map(|ss| ss.spans.iter())
            .map(|s| s.name.clone())
            .collect()
    }
}

#[derive(Clone)]
struct CollectorState {
    requests: Arc<Mutex<Vec<Captured>>>,
    calls: Arc<AtomicU32>,
    fail_first: u32,
    failure: StatusCode,
}

/// A running mock OTLP/HTTP collector.
pub struct MockCollector {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Captured>>>,
}

impl MockCollector {
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a collector that answers 200 to every export.
pub async fn start_mock_collector() -> MockCollector {
    start_flaky_collector(0, StatusCode::OK).await
}

/// Start a collector that answers `failure` to the first `fail_first` exports.
pub async fn start_flaky_collector(fail_first: u32, failure: StatusCode) -> MockCollector {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = CollectorState {
        requests: requests.clone(),
        calls: Arc::new(AtomicU32::new(0)),
        fail_first,
        failure,
    };
    let app = Router::new()
        .route("/v1/traces", post(collect))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockCollector { addr, requests }
}

async fn collect(
    State(state): State<CollectorState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let header_string = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.requests.lock().unwrap().push(Captured {
        authorization: header_string(header::AUTHORIZATION),
        content_type: header_string(header::CONTENT_TYPE),
        body,
    });

    if state.calls.fetch_add(1, Ordering::SeqCst) < state.fail_first {
        state.failure
    } else {
        StatusCode::OK
    }
}

/// Router wired to an in-memory exporter.
pub fn test_app(inputs: impl InputSource + 'static) -> (Router, Telemetry, InMemorySpanExporter) {
    let exporter = InMemorySpanExporter::new();
    let telemetry = Telemetry::with_exporter(
        Arc::new(Resource::empty()),
        exporter.clone(),
        BatchConfig::default(),
    );
    let state = AppState {
        telemetry: telemetry.clone(),
        kernel: Arc::new(Fibonacci),
        inputs: Arc::new(inputs),
        policy: LimitPolicy::default(),
    };
    (build_router(state, Duration::from_secs(5)), telemetry, exporter)
}
