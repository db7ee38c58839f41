//! Configuration schema definitions.
//!
//! This module defines the service configuration consumed by the engine
//! composer. All types derive Serde traits for deserialization from config
//! files.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Root configuration of one gateway service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service name, used in logs.
    pub name: String,

    /// Configuration format version.
    pub version: u32,

    /// Port the HTTP server listens on.
    pub port: u16,

    /// Request timeout in milliseconds.
    pub timeout: u64,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,

    /// Routed endpoints.
    pub endpoints: Vec<EndpointConfig>,

    /// Namespaced configuration for optional modules.
    pub extra_config: ExtraConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "gateway".to_string(),
            version: 3,
            port: 8080,
            timeout: 3_000,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
            endpoints: Vec::new(),
            extra_config: ExtraConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Address the server binds to.
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

/// A routed endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// Path pattern, e.g. `/users/{id}`.
    pub endpoint: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Identifier for logs and metrics. Falls back to the path.
    #[serde(default)]
    pub name: Option<String>,

    /// JSON body served by the static handler factory.
    #[serde(default)]
    pub static_response: Option<Value>,
}

impl EndpointConfig {
    pub fn new(method: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: method.into(),
            name: None,
            static_response: None,
        }
    }

    /// Label used for metrics and logs.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.endpoint)
    }
}

fn default_method() -> String {
    "GET".to_string()
}

/// Extension configuration mapping, keyed by module namespace.
///
/// Every optional module owns its namespace and decodes the blob on its own;
/// nothing outside the module looks at the fields.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct ExtraConfig(Map<String, Value>);

impl ExtraConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw configuration blob of a namespace, if the key is present.
    pub fn section(&self, namespace: &str) -> Option<&Value> {
        self.0.get(namespace)
    }

    pub fn insert(&mut self, namespace: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(namespace.into(), value)
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.0.contains_key(namespace)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for ExtraConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: ServiceConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.timeout, 3_000);
        assert!(config.endpoints.is_empty());
        assert!(config.extra_config.is_empty());
    }

    #[test]
    fn test_endpoint_method_defaults_to_get() {
        let endpoint: EndpointConfig =
            serde_json::from_value(json!({ "endpoint": "/users" })).unwrap();
        assert_eq!(endpoint.method, "GET");
        assert_eq!(endpoint.label(), "/users");
    }

    #[test]
    fn test_extra_config_section_lookup() {
        let config: ServiceConfig = serde_json::from_value(json!({
            "extra_config": {
                "security/http": { "frame_deny": true },
                "security/bot-detector": null
            }
        }))
        .unwrap();

        assert_eq!(
            config.extra_config.section("security/http"),
            Some(&json!({ "frame_deny": true }))
        );
        // Present but null is still present.
        assert_eq!(config.extra_config.section("security/bot-detector"), Some(&Value::Null));
        assert!(config.extra_config.section("modifier/script").is_none());
    }
}
