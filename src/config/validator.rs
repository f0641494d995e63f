//! Startup checks for per-resource query configuration.

use crate::config::ResourceQueryConfig;
use crate::error::ConfigError;

pub fn validate_resource(config: &ResourceQueryConfig) -> Result<(), ConfigError> {
    let fail = |message: String| ConfigError::Resource {
        resource: config.resource.clone(),
        message,
    };

    if config.sortable.is_empty() {
        return Err(fail("at least one sortable field required".into()));
    }
    if !config.sortable.iter().any(|f| *f == config.default_sort) {
        return Err(fail(format!(
            "default sort field '{}' is not sortable",
            config.default_sort
        )));
    }
    if config.max_limit == 0 {
        return Err(fail("max limit must be at least 1".into()));
    }
    if config.default_limit == 0 || config.default_limit > config.max_limit {
        return Err(fail(format!(
            "default limit {} must be within 1..={}",
            config.default_limit, config.max_limit
        )));
    }

    for field in config
        .sortable
        .iter()
        .chain(&config.searchable)
        .chain(&config.filterable)
    {
        if !is_field_name(field) {
            return Err(fail(format!("invalid field name '{}'", field)));
        }
    }
    Ok(())
}

/// Field names become SQL identifiers, so only plain ASCII identifiers are allowed.
fn is_field_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_config() {
        let cfg = ResourceQueryConfig::new("posts", "createdAt")
            .sortable(&["title", "createdAt"])
            .searchable(&["title", "content"])
            .max_limit(50);
        assert!(validate_resource(&cfg).is_ok());
    }

    #[test]
    fn default_sort_must_be_sortable() {
        let cfg = ResourceQueryConfig::new("posts", "createdAt").sortable(&["title"]);
        assert!(validate_resource(&cfg).is_err());
    }

    #[test]
    fn rejects_non_identifier_fields() {
        let cfg = ResourceQueryConfig::new("posts", "createdAt").searchable(&["title; DROP TABLE posts"]);
        assert!(validate_resource(&cfg).is_err());
    }

    #[test]
    fn default_limit_above_ceiling_is_rejected() {
        let cfg = ResourceQueryConfig::new("posts", "createdAt").max_limit(5);
        assert!(validate_resource(&cfg).is_err());
    }
}
