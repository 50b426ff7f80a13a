//! OTLP/HTTP span exporter.
//!
//! Encodes each batch as a protobuf `ExportTraceServiceRequest` and POSTs it
//! to the collector's traces endpoint.

use std::sync::Arc;
use std::time::Duration;

use prost::Message;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use url::Url;

use crate::config::CollectorConfig;
use crate::error::ExportError;
use crate::telemetry::exporter::proto::build_export_request;
use crate::telemetry::exporter::SpanExporter;
use crate::telemetry::resource::Resource;
use crate::telemetry::span::SpanData;

const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";
const SCOPE_NAME: &str = env!("CARGO_PKG_NAME");
const SCOPE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Longest collector response body kept in an error.
const MAX_ERROR_BODY: usize = 512;

pub struct OtlpHttpExporter {
    client: reqwest::Client,
    endpoint: Url,
    resource: Arc<Resource>,
}

impl OtlpHttpExporter {
    pub fn new(config: &CollectorConfig, resource: Arc<Resource>) -> Result<Self, ExportError> {
        let endpoint = config
            .traces_url()
            .map_err(|e| ExportError::InvalidEndpoint(format!("{}: {e}", config.endpoint)))?;

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.auth_token {
            let mut value = HeaderValue::from_str(&format!("{} {}", config.auth_scheme, token))
                .map_err(|_| ExportError::InvalidEndpoint("authorization token is not a valid header value".into()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        tracing::info!(endpoint = %endpoint, "OTLP/HTTP span exporter configured");

        Ok(Self {
            client,
            endpoint,
            resource,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl std::fmt::Debug for OtlpHttpExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtlpHttpExporter")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl SpanExporter for OtlpHttpExporter {
    async fn export(&self, batch: &[SpanData]) -> Result<(), ExportError> {
        let body = build_export_request(&self.resource, SCOPE_NAME, SCOPE_VERSION, batch)
            .encode_to_vec();

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, PROTOBUF_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        Err(ExportError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn shutdown(&self) {
        tracing::debug!(endpoint = %self.endpoint, "OTLP/HTTP span exporter shut down");
    }
}
