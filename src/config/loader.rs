//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ServiceConfig, ConfigError> {
    let config: ServiceConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8090");
        assert_eq!(config.workload.limit_every, 5);
    }

    #[test]
    fn test_partial_sections_merge_with_defaults() {
        let config = parse_config(
            r#"
            [service]
            name = "gosrvc-blackbox"
            environment = "hotday"

            [service.attributes]
            team = "observability"

            [collector]
            endpoint = "https://collector.example.com"
            url_path = "/api/v2/otlp/v1/traces"
            auth_scheme = "Api-Token"
            auth_token = "secret"

            [exporter]
            max_export_batch_size = 64
            "#,
        )
        .unwrap();

        assert_eq!(config.service.name, "gosrvc-blackbox");
        assert_eq!(config.service.attributes["team"], "observability");
        assert_eq!(config.collector.auth_scheme, "Api-Token");
        assert_eq!(config.exporter.max_export_batch_size, 64);
        assert_eq!(config.exporter.max_queue_size, 2048);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(parse_config("listener = 3"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_error_lists_everything() {
        let err = parse_config(
            r#"
            [exporter]
            max_queue_size = 0
            max_attempts = 0
            "#,
        )
        .unwrap_err();

        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/blackbox.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
