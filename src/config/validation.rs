//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (sizes and timeouts > 0, addresses parse)
//! - Check the collector URL can be built
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServiceConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    Address { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("exporter.max_export_batch_size ({batch}) exceeds exporter.max_queue_size ({queue})")]
    BatchLargerThanQueue { batch: usize, queue: usize },

    #[error("collector endpoint is invalid: {0}")]
    Collector(String),

    #[error("service.name must not be empty")]
    EmptyServiceName,

    #[error("observability.log_format must be \"pretty\" or \"json\", got {0:?}")]
    LogFormat(String),
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Address {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::Address {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }
    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::LogFormat(config.observability.log_format.clone()));
    }

    if config.service.name.trim().is_empty() {
        errors.push(ValidationError::EmptyServiceName);
    }
    if let Err(e) = config.collector.traces_url() {
        errors.push(ValidationError::Collector(e.to_string()));
    }

    let exporter = &config.exporter;
    let positive = [
        ("exporter.max_queue_size", exporter.max_queue_size as u64),
        ("exporter.max_export_batch_size", exporter.max_export_batch_size as u64),
        ("exporter.scheduled_delay_ms", exporter.scheduled_delay_ms),
        ("exporter.max_export_timeout_ms", exporter.max_export_timeout_ms),
        ("exporter.max_attempts", u64::from(exporter.max_attempts)),
        ("exporter.shutdown_timeout_ms", exporter.shutdown_timeout_ms),
        ("workload.max_input", config.workload.max_input),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }
    if exporter.max_queue_size > 0 && exporter.max_export_batch_size > exporter.max_queue_size {
        errors.push(ValidationError::BatchLargerThanQueue {
            batch: exporter.max_export_batch_size,
            queue: exporter.max_queue_size,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
