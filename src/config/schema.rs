//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Identity attached to every exported span batch.
    pub service: ServiceIdentityConfig,

    /// Remote collector the spans are shipped to.
    pub collector: CollectorConfig,

    /// Span batching, retry and shutdown behaviour.
    pub exporter: ExporterConfig,

    /// Kernel input and limit policy.
    pub workload: WorkloadConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8090").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8090".to_string(),
        }
    }
}

/// Service identity (resource attributes).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceIdentityConfig {
    /// `service.name`.
    pub name: String,

    /// `service.version`.
    pub version: String,

    /// `environment` tag; omitted when empty.
    pub environment: String,

    /// Extra resource attributes; applied last.
    pub attributes: BTreeMap<String, String>,

    /// Semantic conventions schema URL for the attributes above.
    pub schema_url: Option<String>,
}

impl Default for ServiceIdentityConfig {
    fn default() -> Self {
        Self {
            name: "blackbox-service".to_string(),
            version: "v1.0.0".to_string(),
            environment: "dev".to_string(),
            attributes: BTreeMap::new(),
            schema_url: Some("https://opentelemetry.io/schemas/1.7.0".to_string()),
        }
    }
}

/// OTLP/HTTP collector settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Base URL or bare host. A bare host is contacted over HTTPS.
    pub endpoint: String,

    /// Path of the traces endpoint on the collector.
    pub url_path: String,

    /// Token sent as `Authorization: <auth_scheme> <auth_token>`.
    pub auth_token: Option<String>,

    /// Authorization scheme (e.g., "Bearer", "Api-Token").
    pub auth_scheme: String,

    /// Per-request HTTP timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl CollectorConfig {
    /// Full URL of the traces endpoint.
    pub fn traces_url(&self) -> Result<Url, url::ParseError> {
        let base = if self.endpoint.contains("://") {
            Url::parse(&self.endpoint)?
        } else {
            Url::parse(&format!("https://{}", self.endpoint))?
        };
        base.join(&self.url_path)
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4318".to_string(),
            url_path: "/v1/traces".to_string(),
            auth_token: None,
            auth_scheme: "Bearer".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

/// Batch export pipeline settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Capacity of the span queue; spans beyond it are dropped.
    pub max_queue_size: usize,

    /// Spans per export call; a full buffer is exported immediately.
    pub max_export_batch_size: usize,

    /// Interval between time-based flushes in milliseconds.
    pub scheduled_delay_ms: u64,

    /// Upper bound on one export attempt in milliseconds.
    pub max_export_timeout_ms: u64,

    /// Total attempts per batch, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Deadline for the final flush on shutdown in milliseconds.
    pub shutdown_timeout_ms: u64,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 2048,
            max_export_batch_size: 512,
            scheduled_delay_ms: 5_000,
            max_export_timeout_ms: 30_000,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
            shutdown_timeout_ms: 5_000,
        }
    }
}

/// Kernel input settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Inputs divisible by this are treated as hitting the processing limit.
    /// Zero disables the rule.
    pub limit_every: u64,

    /// Random inputs are drawn from `0..max_input`.
    pub max_input: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            limit_every: 5,
            max_input: 20,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins.
    pub log_level: String,

    /// "pretty" or "json".
    pub log_format: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traces_url_from_bare_host() {
        let collector = CollectorConfig {
            endpoint: "abc123.live.example.com".to_string(),
            url_path: "/api/v2/otlp/v1/traces".to_string(),
            ..Default::default()
        };
        assert_eq!(
            collector.traces_url().unwrap().as_str(),
            "https://abc123.live.example.com/api/v2/otlp/v1/traces"
        );
    }

    #[test]
    fn test_traces_url_keeps_explicit_scheme() {
        let collector = CollectorConfig {
            endpoint: "http://127.0.0.1:4318".to_string(),
            ..Default::default()
        };
        assert_eq!(collector.traces_url().unwrap().as_str(), "http://127.0.0.1:4318/v1/traces");
    }
}
