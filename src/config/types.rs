//! Runtime settings and per-resource query configuration.

use crate::query::SortOrder;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Deployment environment. Development exposes error stacks and response previews.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// What to do with a `sortBy`/`sortOrder` outside the allow-list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortPolicy {
    /// Replace with the resource default.
    #[default]
    Permissive,
    /// Reject with a validation failure.
    Strict,
}

/// Declarative query surface of one resource: which fields may be sorted,
/// searched and filtered, plus paging defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceQueryConfig {
    pub resource: String,
    pub sortable: Vec<String>,
    pub searchable: Vec<String>,
    #[serde(default)]
    pub filterable: Vec<String>,
    pub default_sort: String,
    #[serde(default = "default_order")]
    pub default_order: SortOrder,
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
    #[serde(default)]
    pub sort_policy: SortPolicy,
}

fn default_order() -> SortOrder {
    SortOrder::Desc
}

fn default_limit() -> u32 {
    10
}

fn default_max_limit() -> u32 {
    100
}

impl ResourceQueryConfig {
    pub fn new(resource: &str, default_sort: &str) -> Self {
        ResourceQueryConfig {
            resource: resource.to_string(),
            sortable: vec![default_sort.to_string()],
            searchable: Vec::new(),
            filterable: Vec::new(),
            default_sort: default_sort.to_string(),
            default_order: default_order(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            sort_policy: SortPolicy::default(),
        }
    }

    pub fn sortable(mut self, fields: &[&str]) -> Self {
        self.sortable = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn searchable(mut self, fields: &[&str]) -> Self {
        self.searchable = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn filterable(mut self, fields: &[&str]) -> Self {
        self.filterable = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn max_limit(mut self, max: u32) -> Self {
        self.max_limit = max;
        self
    }

    pub fn sort_policy(mut self, policy: SortPolicy) -> Self {
        self.sort_policy = policy;
        self
    }
}

/// Redaction and truncation rules for the audit log.
#[derive(Clone, Debug)]
pub struct AuditSettings {
    /// Header names whose values are never logged (matched case-insensitively).
    pub sensitive_headers: Vec<String>,
    /// Substrings that mark a body key as sensitive.
    pub sensitive_fields: Vec<String>,
    /// Serialized payloads longer than this are replaced by a preview.
    pub payload_limit: usize,
    /// Bodies larger than this are not buffered for logging.
    pub body_buffer_limit: usize,
}

impl Default for AuditSettings {
    fn default() -> Self {
        AuditSettings {
            sensitive_headers: ["authorization", "cookie", "set-cookie", "x-api-key", "api-key"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sensitive_fields: ["password", "token", "secret", "creditcard"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            payload_limit: 1000,
            body_buffer_limit: 64 * 1024,
        }
    }
}

/// Process-wide settings, read once at startup.
#[derive(Clone, Debug)]
pub struct Settings {
    pub environment: Environment,
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_schema: String,
    pub sort_policy: SortPolicy,
    /// Deadline applied to paginated store reads.
    pub store_timeout: Option<Duration>,
    pub request_body_limit: usize,
    pub audit: AuditSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            environment: Environment::default(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: "postgres://localhost/crud_pipeline".into(),
            db_max_connections: 5,
            db_schema: "public".into(),
            sort_policy: SortPolicy::default(),
            store_timeout: None,
            request_body_limit: 1024 * 1024,
            audit: AuditSettings::default(),
        }
    }
}
