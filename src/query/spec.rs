//! Raw query parameters to a canonical [`QuerySpec`].

use crate::config::{ResourceQueryConfig, SortPolicy};
use crate::error::{AppError, FieldError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_PAGE: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Case-insensitive `asc` / `desc`.
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Some(SortOrder::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Some(SortOrder::Desc)
        } else {
            None
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Normalized filter/search/sort/paging intent of one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuerySpec {
    pub search_term: Option<String>,
    /// Equality filters, API field name to value.
    pub filters: BTreeMap<String, String>,
    pub sort_by: String,
    pub sort_order: SortOrder,
    pub page: u32,
    pub limit: u32,
    /// Fields the search term is matched against (OR-combined).
    pub search_fields: Vec<String>,
}

impl QuerySpec {
    /// First page with the resource defaults and no filters.
    pub fn defaults(config: &ResourceQueryConfig) -> Self {
        QuerySpec {
            search_term: None,
            filters: BTreeMap::new(),
            sort_by: config.default_sort.clone(),
            sort_order: config.default_order,
            page: DEFAULT_PAGE,
            limit: config.default_limit.clamp(1, config.max_limit.max(1)),
            search_fields: config.searchable.clone(),
        }
    }

    /// Build from query-string pairs. Only fails under [`SortPolicy::Strict`].
    pub fn from_params(
        params: &HashMap<String, String>,
        config: &ResourceQueryConfig,
    ) -> Result<Self, AppError> {
        let mut spec = QuerySpec::defaults(config);
        let mut violations = Vec::new();
        let ceiling = config.max_limit.max(1);

        for (key, raw) in params {
            let value = raw.trim();
            match key.as_str() {
                "page" => {
                    spec.page = coerce(value).map(|n| n.clamp(1, i64::from(u32::MAX)) as u32).unwrap_or(DEFAULT_PAGE);
                }
                "limit" => {
                    spec.limit = coerce(value)
                        .map(|n| n.clamp(1, i64::from(ceiling)) as u32)
                        .unwrap_or(spec.limit);
                }
                "searchTerm" => {
                    spec.search_term = Some(value.to_string()).filter(|s| !s.is_empty());
                }
                "sortBy" => {
                    if config.sortable.iter().any(|f| f == value) {
                        spec.sort_by = value.to_string();
                    } else if config.sort_policy == SortPolicy::Strict {
                        violations.push(FieldError::new(
                            "sortBy",
                            format!("sortBy must be one of: {}", config.sortable.join(", ")),
                        ));
                    }
                }
                "sortOrder" | "order" => match SortOrder::parse(value) {
                    Some(order) => spec.sort_order = order,
                    None if config.sort_policy == SortPolicy::Strict => {
                        violations.push(FieldError::new(key.as_str(), format!("{} must be one of: asc, desc", key)));
                    }
                    None => {}
                },
                _ => {
                    if config.filterable.iter().any(|f| f == key) && !value.is_empty() {
                        spec.filters.insert(key.clone(), value.to_string());
                    }
                }
            }
        }

        if violations.is_empty() {
            Ok(spec)
        } else {
            violations.sort_by(|a, b| a.field.cmp(&b.field));
            Err(AppError::Validation(violations))
        }
    }

    pub fn with_filter(mut self, field: &str, value: &str) -> Self {
        self.filters.insert(field.to_string(), value.to_string());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit.max(1);
        self
    }

    /// Rows skipped before the current page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

fn coerce(value: &str) -> Option<i64> {
    value.parse::<i64>().ok()
}
