//! End-to-end span trees produced by the HTTP handlers.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;

use blackbox_service::http::server::QUOTE_SPAN;
use blackbox_service::kernel::FixedInput;
use blackbox_service::telemetry::{AttributeValue, SpanData, SpanId, SpanKind, Status, TraceId};

mod common;

const INCOMING: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

async fn get(router: Router, uri: &str, traceparent: Option<&str>) -> (StatusCode, String) {
    let mut builder = Request::builder().uri(uri);
    if let Some(value) = traceparent {
        builder = builder.header("traceparent", value);
    }
    let res = router.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
    let status = res.status();
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn by_name<'a>(spans: &'a [SpanData], name: &str) -> &'a SpanData {
    spans.iter().find(|s| s.name == name).unwrap()
}

#[tokio::test]
async fn test_quote_on_limit_input() {
    let (router, telemetry, exporter) = common::test_app(FixedInput(5));

    let (status, body) = get(router, "/quote", Some(INCOMING)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "done\n");

    telemetry.force_flush().await.unwrap();
    let spans = exporter.finished_spans();
    assert_eq!(spans.len(), 2);

    let mut names: Vec<_> = spans.iter().map(|s| s.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["gosrvc-quote", "process"]);

    let server = by_name(&spans, QUOTE_SPAN);
    let process = by_name(&spans, "process");

    let incoming_trace = TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap();
    assert_eq!(server.kind, SpanKind::Server);
    assert_eq!(server.context.trace_id(), incoming_trace);
    assert_eq!(server.parent_span_id, SpanId::from_hex("00f067aa0ba902b7").unwrap());

    assert_eq!(process.kind, SpanKind::Internal);
    assert_eq!(process.context.trace_id(), incoming_trace);
    assert_eq!(process.parent_span_id, server.context.span_id());
    assert_eq!(process.attribute("n"), Some(&AttributeValue::I64(5)));
    assert_eq!(process.status, Status::error("Critical Error"));

    let exceptions: Vec<_> = process.exceptions().collect();
    assert_eq!(exceptions.len(), 1);
    assert_eq!(
        exceptions[0].attribute("exception.type"),
        Some(&AttributeValue::from("Processing exception"))
    );
    assert_eq!(
        exceptions[0].attribute("exception.message"),
        Some(&AttributeValue::from("You have hit the limit!"))
    );
    assert!(process.end_time <= server.end_time);
}

#[tokio::test]
async fn test_quote_on_ordinary_input() {
    let (router, telemetry, exporter) = common::test_app(FixedInput(7));

    get(router, "/quote", Some(INCOMING)).await;
    telemetry.force_flush().await.unwrap();

    let spans = exporter.finished_spans();
    let process = by_name(&spans, "process");
    assert_eq!(process.attribute("n"), Some(&AttributeValue::I64(7)));
    assert_eq!(process.exceptions().count(), 0);
    assert_eq!(process.status, Status::Unset);
    assert_eq!(by_name(&spans, QUOTE_SPAN).status, Status::Unset);
}

#[tokio::test]
async fn test_quote_without_header_starts_new_trace() {
    let (router, telemetry, exporter) = common::test_app(FixedInput(5));

    let (_, body) = get(router, "/quote", None).await;
    assert_eq!(body, "done\n");
    telemetry.force_flush().await.unwrap();

    let spans = exporter.finished_spans();
    assert_eq!(spans.len(), 2);
    let server = by_name(&spans, QUOTE_SPAN);
    let process = by_name(&spans, "process");
    assert_eq!(server.kind, SpanKind::Server);
    assert!(server.context.trace_id().is_valid());
    assert!(!server.parent_span_id.is_valid());
    assert_eq!(process.context.trace_id(), server.context.trace_id());
    assert_eq!(process.parent_span_id, server.context.span_id());
    assert_eq!(process.exceptions().count(), 1);
}

#[tokio::test]
async fn test_malformed_header_starts_new_trace() {
    let (router, telemetry, exporter) = common::test_app(FixedInput(7));

    let (status, _) = get(router, "/quote", Some("00-xyz-00f067aa0ba902b7-01")).await;
    assert_eq!(status, StatusCode::OK);
    telemetry.force_flush().await.unwrap();

    let server = by_name(&exporter.finished_spans(), QUOTE_SPAN).clone();
    assert!(server.context.trace_id().is_valid());
    assert!(!server.parent_span_id.is_valid());
}

#[tokio::test]
async fn test_calc_has_no_server_span() {
    let (router, telemetry, exporter) = common::test_app(FixedInput(7));

    let (status, body) = get(router, "/calc", Some(INCOMING)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "done\n");
    telemetry.force_flush().await.unwrap();

    let spans = exporter.finished_spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].name, "process");
    assert_eq!(
        spans[0].context.trace_id(),
        TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap()
    );
    assert_eq!(spans[0].parent_span_id, SpanId::from_hex("00f067aa0ba902b7").unwrap());
}

#[tokio::test]
async fn test_calc_without_header_is_root() {
    let (router, telemetry, exporter) = common::test_app(FixedInput(3));

    get(router, "/calc", None).await;
    telemetry.force_flush().await.unwrap();

    let spans = exporter.finished_spans();
    assert_eq!(spans.len(), 1);
    assert!(spans[0].context.trace_id().is_valid());
    assert!(!spans[0].parent_span_id.is_valid());
}

#[tokio::test]
async fn test_kernel_error_does_not_change_response() {
    let (router, telemetry, exporter) = common::test_app(FixedInput(101));

    let (status, body) = get(router, "/quote", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "done\n");
    telemetry.force_flush().await.unwrap();

    let spans = exporter.finished_spans();
    let process = by_name(&spans, "process");
    assert_eq!(
        process.status,
        Status::error("unsupported fibonacci number 101: too large")
    );
    assert_eq!(by_name(&spans, QUOTE_SPAN).status, Status::Unset);
}

#[tokio::test]
async fn test_each_request_gets_its_own_spans() {
    let (router, telemetry, exporter) = common::test_app(FixedInput(7));

    for _ in 0..3 {
        get(router.clone(), "/quote", Some(INCOMING)).await;
    }
    telemetry.force_flush().await.unwrap();

    let spans = exporter.finished_spans();
    assert_eq!(spans.len(), 6);
    let mut span_ids: Vec<_> = spans.iter().map(|s| s.context.span_id()).collect();
    span_ids.sort_by_key(|id| id.to_bytes());
    span_ids.dedup();
    assert_eq!(span_ids.len(), 6);
}
