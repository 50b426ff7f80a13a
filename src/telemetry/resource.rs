//! Service identity attached to every exported batch.
//!
//! # Merge Order
//! ```text
//! SDK defaults (telemetry.sdk.*, process.pid, host.name)
//!     → OTEL_SERVICE_NAME / OTEL_RESOURCE_ATTRIBUTES
//!     → configured service.name, service.version, environment
//!     → configured custom tags
//! ```
//! Later keys win.
//!
//! # Design Decisions
//! - Built once at startup, shared via `Arc`, never mutated
//! - Problems are returned as warnings next to a best-effort resource;
//!   startup never fails because of the resource

use std::sync::Arc;

use crate::config::ServiceIdentityConfig;
use crate::error::ResourceWarning;
use crate::telemetry::attributes::{self, AttributeValue, KeyValue};

pub const SERVICE_NAME: &str = "service.name";
pub const SERVICE_VERSION: &str = "service.version";
pub const ENVIRONMENT: &str = "environment";

/// `telemetry.sdk.name` of the in-crate tracing library.
pub const SDK_NAME: &str = "blackbox-telemetry";

const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";
const OTEL_RESOURCE_ATTRIBUTES: &str = "OTEL_RESOURCE_ATTRIBUTES";
const UNKNOWN_SERVICE: &str = "unknown_service";

/// Immutable attribute set describing this process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resource {
    attributes: Vec<KeyValue>,
    schema_url: Option<String>,
}

impl Resource {
    pub fn new(attributes: impl IntoIterator<Item = KeyValue>, schema_url: Option<String>) -> Self {
        let mut merged = Vec::new();
        for kv in attributes {
            attributes::upsert(&mut merged, kv);
        }
        Self {
            attributes: merged,
            schema_url,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        attributes::find(&self.attributes, key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyValue> {
        self.attributes.iter()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn schema_url(&self) -> Option<&str> {
        self.schema_url.as_deref()
    }

    /// Merge `other` over `self`; `other`'s keys win.
    ///
    /// Two different schema URLs cannot be reconciled: the merged resource
    /// keeps every attribute but no schema URL, and a warning is returned.
    pub fn merge(&self, other: &Resource) -> (Resource, Option<ResourceWarning>) {
        let mut attrs = self.attributes.clone();
        for kv in &other.attributes {
            attributes::upsert(&mut attrs, kv.clone());
        }

        let (schema_url, warning) = match (&self.schema_url, &other.schema_url) {
            (Some(a), Some(b)) if a == b => (Some(a.clone()), None),
            (Some(a), Some(b)) => (
                None,
                Some(ResourceWarning::SchemaUrlConflict {
                    existing: a.clone(),
                    incoming: b.clone(),
                }),
            ),
            (Some(a), None) => (Some(a.clone()), None),
            (None, b) => (b.clone(), None),
        };

        (
            Resource {
                attributes: attrs,
                schema_url,
            },
            warning,
        )
    }
}

/// A resource plus everything that went wrong building it.
#[derive(Debug)]
pub struct ResourceOutcome {
    pub resource: Arc<Resource>,
    pub warnings: Vec<ResourceWarning>,
}

/// Build the service resource from the process environment and config.
pub fn build_resource(config: &ServiceIdentityConfig) -> ResourceOutcome {
    build_resource_with_env(config, |key| std::env::var(key).ok())
}

/// Build the service resource with an explicit environment lookup.
pub fn build_resource_with_env<F>(config: &ServiceIdentityConfig, env: F) -> ResourceOutcome
where
    F: Fn(&str) -> Option<String>,
{
    let mut warnings = Vec::new();

    let (defaults, env_warnings) = default_resource(&env);
    warnings.extend(env_warnings);

    let mut overrides = vec![
        KeyValue::new(SERVICE_NAME, config.name.as_str()),
        KeyValue::new(SERVICE_VERSION, config.version.as_str()),
    ];
    if !config.environment.is_empty() {
        overrides.push(KeyValue::new(ENVIRONMENT, config.environment.as_str()));
    }
    overrides.extend(
        config
            .attributes
            .iter()
            .map(|(k, v)| KeyValue::new(k.as_str(), v.as_str())),
    );
    let overrides = Resource::new(overrides, config.schema_url.clone());

    let (resource, warning) = defaults.merge(&overrides);
    warnings.extend(warning);

    ResourceOutcome {
        resource: Arc::new(resource),
        warnings,
    }
}

fn default_resource<F>(env: &F) -> (Resource, Vec<ResourceWarning>)
where
    F: Fn(&str) -> Option<String>,
{
    let mut attrs = vec![
        KeyValue::new("telemetry.sdk.name", SDK_NAME),
        KeyValue::new("telemetry.sdk.language", "rust"),
        KeyValue::new("telemetry.sdk.version", env!("CARGO_PKG_VERSION")),
        KeyValue::new("process.pid", i64::from(std::process::id())),
    ];
    if let Some(host) = env("HOSTNAME").filter(|h| !h.is_empty()) {
        attrs.push(KeyValue::new("host.name", host));
    }

    let service_name = env(OTEL_SERVICE_NAME)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_SERVICE.to_string());
    attrs.push(KeyValue::new(SERVICE_NAME, service_name));

    let mut warnings = Vec::new();
    if let Some(raw) = env(OTEL_RESOURCE_ATTRIBUTES) {
        for entry in raw.split_terminator(',') {
            match entry.split_once('=') {
                Some((k, v)) if !k.trim().is_empty() => {
                    attrs.push(KeyValue::new(k.trim(), v.trim()));
                }
                _ => warnings.push(ResourceWarning::MalformedEnvEntry(entry.to_string())),
            }
        }
    }

    (Resource::new(attrs, None), warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};

    fn identity() -> ServiceIdentityConfig {
        ServiceIdentityConfig {
            name: "blackbox".to_string(),
            version: "v1.0.0".to_string(),
            environment: "hotday".to_string(),
            attributes: BTreeMap::new(),
            schema_url: Some("https://opentelemetry.io/schemas/1.7.0".to_string()),
        }
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_overrides_win_over_environment() {
        let env = env_from(&[
            ("OTEL_SERVICE_NAME", "from-env"),
            ("OTEL_RESOURCE_ATTRIBUTES", "team=core,environment=dev"),
        ]);
        let outcome = build_resource_with_env(&identity(), env);
        let resource = outcome.resource;

        assert!(outcome.warnings.is_empty());
        assert_eq!(resource.get(SERVICE_NAME), Some(&AttributeValue::from("blackbox")));
        assert_eq!(resource.get(SERVICE_VERSION), Some(&AttributeValue::from("v1.0.0")));
        assert_eq!(resource.get(ENVIRONMENT), Some(&AttributeValue::from("hotday")));
        assert_eq!(resource.get("team"), Some(&AttributeValue::from("core")));
        assert_eq!(resource.get("telemetry.sdk.language"), Some(&AttributeValue::from("rust")));
        assert_eq!(resource.schema_url(), Some("https://opentelemetry.io/schemas/1.7.0"));
    }

    #[test]
    fn test_sdk_name_is_not_the_service() {
        let config = ServiceIdentityConfig::default();
        let outcome = build_resource_with_env(&config, env_from(&[]));
        let resource = outcome.resource;

        assert_eq!(resource.get(SERVICE_NAME), Some(&AttributeValue::from("blackbox-service")));
        assert_eq!(resource.get("telemetry.sdk.name"), Some(&AttributeValue::from(SDK_NAME)));
        assert_ne!(resource.get("telemetry.sdk.name"), resource.get(SERVICE_NAME));
    }

    #[test]
    fn test_custom_tags_win_last() {
        let mut config = identity();
        config.attributes.insert("environment".to_string(), "staging".to_string());

        let outcome = build_resource_with_env(&config, env_from(&[]));
        assert_eq!(outcome.resource.get(ENVIRONMENT), Some(&AttributeValue::from("staging")));
    }

    #[test]
    fn test_malformed_env_entries_are_warnings() {
        let env = env_from(&[("OTEL_RESOURCE_ATTRIBUTES", "good=1,broken,=empty")]);
        let outcome = build_resource_with_env(&identity(), env);

        assert_eq!(outcome.resource.get("good"), Some(&AttributeValue::from("1")));
        assert_eq!(
            outcome.warnings,
            vec![
                ResourceWarning::MalformedEnvEntry("broken".to_string()),
                ResourceWarning::MalformedEnvEntry("=empty".to_string()),
            ]
        );
    }

    #[test]
    fn test_schema_conflict_keeps_attributes() {
        let a = Resource::new([KeyValue::new("a", "1")], Some("https://schema/a".to_string()));
        let b = Resource::new([KeyValue::new("b", "2")], Some("https://schema/b".to_string()));

        let (merged, warning) = a.merge(&b);
        assert!(matches!(warning, Some(ResourceWarning::SchemaUrlConflict { .. })));
        assert_eq!(merged.schema_url(), None);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_matching_schema() {
        let a = Resource::new([KeyValue::new("k", "1")], Some("s".to_string()));
        let b = Resource::new([KeyValue::new("k", "2")], Some("s".to_string()));

        let (merged, warning) = a.merge(&b);
        assert!(warning.is_none());
        assert_eq!(merged.schema_url(), Some("s"));
        assert_eq!(merged.get("k"), Some(&AttributeValue::from("2")));
    }
}
