//! Mapping from finished spans onto the OTLP trace messages
//! (`opentelemetry.proto.collector.trace.v1`).

use std::time::{SystemTime, UNIX_EPOCH};

use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, InstrumentationScope, KeyValue};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::span::{Event, SpanKind};
use opentelemetry_proto::tonic::trace::v1::status::StatusCode;
use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, ScopeSpans, Span, Status};

use crate::telemetry::attributes::{AttributeValue, KeyValue as SdkKeyValue};
use crate::telemetry::resource::Resource as SdkResource;
use crate::telemetry::span::{SpanData, SpanKind as SdkSpanKind, Status as SdkStatus};

/// Group a batch under one resource and instrumentation scope.
pub fn build_export_request(
    resource: &SdkResource,
    scope_name: &str,
    scope_version: &str,
    batch: &[SpanData],
) -> ExportTraceServiceRequest {
    ExportTraceServiceRequest {
        resource_spans: vec![ResourceSpans {
            resource: Some(Resource {
                attributes: resource.iter().map(key_value).collect(),
                ..Default::default()
            }),
            scope_spans: vec![ScopeSpans {
                scope: Some(InstrumentationScope {
                    name: scope_name.to_string(),
                    version: scope_version.to_string(),
                    ..Default::default()
                }),
                spans: batch.iter().map(span).collect(),
                schema_url: String::new(),
            }],
            schema_url: resource.schema_url().unwrap_or_default().to_string(),
        }],
    }
}

fn span(data: &SpanData) -> Span {
    let parent_span_id = if data.parent_span_id.is_valid() {
        data.parent_span_id.to_bytes().to_vec()
    } else {
        Vec::new()
    };
    Span {
        trace_id: data.context.trace_id().to_bytes().to_vec(),
        span_id: data.context.span_id().to_bytes().to_vec(),
        parent_span_id,
        name: data.name.clone(),
        kind: span_kind(data.kind) as i32,
        start_time_unix_nano: unix_nanos(data.start_time),
        end_time_unix_nano: unix_nanos(data.end_time),
        attributes: data.attributes.iter().map(key_value).collect(),
        events: data
            .events
            .iter()
            .map(|event| Event {
                time_unix_nano: unix_nanos(event.timestamp),
                name: event.name.clone(),
                attributes: event.attributes.iter().map(key_value).collect(),
                ..Default::default()
            })
            .collect(),
        status: Some(status(&data.status)),
        ..Default::default()
    }
}

fn span_kind(kind: SdkSpanKind) -> SpanKind {
    match kind {
        SdkSpanKind::Internal => SpanKind::Internal,
        SdkSpanKind::Server => SpanKind::Server,
    }
}

fn status(status: &SdkStatus) -> Status {
    let (code, message) = match status {
        SdkStatus::Unset => (StatusCode::Unset, String::new()),
        SdkStatus::Ok => (StatusCode::Ok, String::new()),
        SdkStatus::Error { message } => (StatusCode::Error, message.clone()),
    };
    Status {
        message,
        code: code as i32,
    }
}

fn key_value(kv: &SdkKeyValue) -> KeyValue {
    let value = match &kv.value {
        AttributeValue::String(s) => any_value::Value::StringValue(s.clone()),
        AttributeValue::Bool(b) => any_value::Value::BoolValue(*b),
        AttributeValue::I64(i) => any_value::Value::IntValue(*i),
        AttributeValue::F64(f) => any_value::Value::DoubleValue(*f),
    };
    KeyValue {
        key: kv.key.clone(),
        value: Some(AnyValue { value: Some(value) }),
    }
}

fn unix_nanos(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}
