//! In-process repository backed by a vector. Meant for tests and local runs;
//! production deployments use [`super::PgRepository`].

use crate::error::AppError;
use crate::query::{QuerySpec, SortOrder};
use crate::repository::{Repository, Resource};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use std::cmp::Ordering;
use tokio::sync::RwLock;
use uuid::Uuid;

pub struct InMemoryRepository<T> {
    rows: RwLock<Vec<T>>,
    unique: Vec<String>,
}

impl<T: Resource> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Resource> InMemoryRepository<T> {
    pub fn new() -> Self {
        InMemoryRepository {
            rows: RwLock::new(Vec::new()),
            unique: Vec::new(),
        }
    }

    /// Fields whose values must be unique across rows, like a unique index.
    pub fn with_unique(mut self, fields: &[&str]) -> Self {
        self.unique = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Matching rows in insertion order, serialized alongside the entity.
    async fn matching(&self, spec: &QuerySpec) -> Result<Vec<(T, Value)>, AppError> {
        let rows = self.rows.read().await;
        let mut out = Vec::new();
        for row in rows.iter() {
            let value = to_value(row)?;
            if matches(&value, spec) {
                out.push((row.clone(), value));
            }
        }
        Ok(out)
    }
}

fn to_value<T: Resource>(row: &T) -> Result<Value, AppError> {
    serde_json::to_value(row).map_err(|e| AppError::Internal(format!("serialize {}: {}", T::NAME, e)))
}

fn as_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn matches(row: &Value, spec: &QuerySpec) -> bool {
    let filters_ok = spec
        .filters
        .iter()
        .all(|(field, want)| row.get(field).map(as_text).as_deref() == Some(want.as_str()));
    if !filters_ok {
        return false;
    }
    match spec.search_term.as_deref() {
        None => true,
        Some(term) => {
            let needle = term.to_lowercase();
            spec.search_fields
                .iter()
                .filter_map(|f| row.get(f))
                .any(|v| as_text(v).to_lowercase().contains(&needle))
        }
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (
                DateTime::<FixedOffset>::parse_from_rfc3339(x),
                DateTime::<FixedOffset>::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(x), Some(y)) => as_text(x).cmp(&as_text(y)),
    }
}

#[async_trait]
impl<T: Resource> Repository<T> for InMemoryRepository<T> {
    async fn count(&self, spec: &QuerySpec) -> Result<u64, AppError> {
        Ok(self.matching(spec).await?.len() as u64)
    }

    async fn fetch_page(&self, spec: &QuerySpec) -> Result<Vec<T>, AppError> {
        let mut rows = self.matching(spec).await?;
        // stable: ties keep insertion order
        rows.sort_by(|(_, a), (_, b)| {
            let ord = compare(a.get(&spec.sort_by), b.get(&spec.sort_by));
            match spec.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
        let skip = usize::try_from(spec.offset()).unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(skip)
            .take(spec.limit as usize)
            .map(|(row, _)| row)
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, AppError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|r| r.id() == id).cloned())
    }

    async fn save(&self, entity: T) -> Result<T, AppError> {
        let mut rows = self.rows.write().await;
        let incoming = to_value(&entity)?;
        for field in &self.unique {
            let Some(value) = incoming.get(field).filter(|v| !v.is_null()) else { continue };
            for other in rows.iter().filter(|r| r.id() != entity.id()) {
                if to_value(other)?.get(field) == Some(value) {
                    return Err(AppError::duplicate(T::NAME, field));
                }
            }
        }
        match rows.iter_mut().find(|r| r.id() == entity.id()) {
            Some(slot) => *slot = entity.clone(),
            None => rows.push(entity.clone()),
        }
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|r| r.id() != id);
        Ok(rows.len() != before)
    }
}
