//! Metrics collection and exposition.
//!
//! # Metrics
//! - `blackbox_requests_total` (counter): requests by route, status
//! - `blackbox_request_duration_seconds` (histogram): latency distribution
//! - `telemetry_spans_exported_total` (counter): spans accepted by the collector
//! - `telemetry_spans_dropped_total` (counter): spans lost before export, by reason
//! - `telemetry_export_retries_total` (counter): export attempts retried
//! - `telemetry_export_failures_total` (counter): spans in batches given up on
//!
//! Without an installed recorder every call below is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe();
            tracing::info!(address = %addr, "Metrics endpoint started");
        }
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install Prometheus recorder"),
    }
}

fn describe() {
    ::metrics::describe_counter!("blackbox_requests_total", "HTTP requests served");
    ::metrics::describe_histogram!(
        "blackbox_request_duration_seconds",
        ::metrics::Unit::Seconds,
        "HTTP request latency"
    );
    ::metrics::describe_counter!("telemetry_spans_exported_total", "Spans accepted by the collector");
    ::metrics::describe_counter!("telemetry_spans_dropped_total", "Spans dropped before export");
    ::metrics::describe_counter!("telemetry_export_retries_total", "Retried export attempts");
    ::metrics::describe_counter!("telemetry_export_failures_total", "Spans in batches that could not be exported");
}

pub fn record_request(route: &'static str, status: u16, start: Instant) {
    let status = status.to_string();
    ::metrics::counter!("blackbox_requests_total", "route" => route, "status" => status).increment(1);
    ::metrics::histogram!("blackbox_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_spans_exported(count: usize) {
    ::metrics::counter!("telemetry_spans_exported_total").increment(count as u64);
}

pub fn record_span_dropped(reason: &'static str) {
    ::metrics::counter!("telemetry_spans_dropped_total", "reason" => reason).increment(1);
}

pub fn record_export_retry() {
    ::metrics::counter!("telemetry_export_retries_total").increment(1);
}

pub fn record_export_failure(spans: usize) {
    ::metrics::counter!("telemetry_export_failures_total").increment(spans as u64);
}
