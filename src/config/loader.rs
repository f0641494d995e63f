//! Load settings from environment variables (a `.env` file is honoured by the binary).

use crate::config::types::{Environment, Settings, SortPolicy};
use crate::error::ConfigError;
use std::str::FromStr;
use std::time::Duration;

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; missing keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("APP_ENV") {
            settings.environment = parse_environment(&v)?;
        }
        if let Some(v) = get("BIND_ADDR") {
            settings.bind_addr = parse("BIND_ADDR", &v)?;
        }
        if let Some(v) = get("DATABASE_URL") {
            settings.database_url = v;
        }
        if let Some(v) = get("DB_MAX_CONNECTIONS") {
            settings.db_max_connections = parse("DB_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = get("DB_SCHEMA") {
            settings.db_schema = v;
        }
        if let Some(v) = get("SORT_POLICY") {
            settings.sort_policy = parse_sort_policy(&v)?;
        }
        if let Some(v) = get("STORE_TIMEOUT_MS") {
            let ms: u64 = parse("STORE_TIMEOUT_MS", &v)?;
            settings.store_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(v) = get("REQUEST_BODY_LIMIT") {
            settings.request_body_limit = parse("REQUEST_BODY_LIMIT", &v)?;
        }
        if let Some(v) = get("AUDIT_PAYLOAD_LIMIT") {
            settings.audit.payload_limit = parse("AUDIT_PAYLOAD_LIMIT", &v)?;
        }
        if let Some(v) = get("AUDIT_BODY_BUFFER_LIMIT") {
            settings.audit.body_buffer_limit = parse("AUDIT_BODY_BUFFER_LIMIT", &v)?;
        }
        Ok(settings)
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn parse_environment(value: &str) -> Result<Environment, ConfigError> {
    match value.to_lowercase().as_str() {
        "development" | "dev" => Ok(Environment::Development),
        "production" | "prod" => Ok(Environment::Production),
        other => Err(ConfigError::Invalid {
            key: "APP_ENV".into(),
            message: format!("expected development or production, got '{}'", other),
        }),
    }
}

fn parse_sort_policy(value: &str) -> Result<SortPolicy, ConfigError> {
    match value.to_lowercase().as_str() {
        "permissive" => Ok(SortPolicy::Permissive),
        "strict" => Ok(SortPolicy::Strict),
        other => Err(ConfigError::Invalid {
            key: "SORT_POLICY".into(),
            message: format!("expected permissive or strict, got '{}'", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(settings.environment, Environment::Production);
        assert_eq!(settings.sort_policy, SortPolicy::Permissive);
        assert_eq!(settings.audit.payload_limit, 1000);
        assert!(settings.store_timeout.is_none());
    }

    #[test]
    fn reads_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("APP_ENV", "Development"),
            ("SORT_POLICY", "strict"),
            ("STORE_TIMEOUT_MS", "250"),
            ("BIND_ADDR", "127.0.0.1:8080"),
        ]))
        .unwrap();
        assert!(settings.environment.is_development());
        assert_eq!(settings.sort_policy, SortPolicy::Strict);
        assert_eq!(settings.store_timeout, Some(Duration::from_millis(250)));
        assert_eq!(settings.bind_addr.port(), 8080);
    }

    #[test]
    fn rejects_garbage() {
        let err = Settings::from_lookup(lookup(&[("DB_MAX_CONNECTIONS", "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "DB_MAX_CONNECTIONS"));
        assert!(Settings::from_lookup(lookup(&[("APP_ENV", "staging")])).is_err());
    }
}
