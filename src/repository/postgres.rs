//! PostgreSQL repository using the safe SQL builder.

use crate::case::to_camel_case;
use crate::error::AppError;
use crate::query::QuerySpec;
use crate::repository::{Repository, Resource};
use crate::sql::{self, PgBindValue, QueryBuf, TableDef};
use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Value};
use sqlx::postgres::{PgDatabaseError, PgRow};
use sqlx::PgPool;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

pub struct PgRepository<T> {
    pool: PgPool,
    table: Arc<TableDef>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Resource> PgRepository<T> {
    pub fn new(pool: PgPool, table: TableDef) -> Self {
        PgRepository {
            pool,
            table: Arc::new(table),
            _entity: PhantomData,
        }
    }

    fn bind<'q>(
        q: &'q QueryBuf,
    ) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        query
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<T>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = Self::bind(q)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, T::NAME, &self.table))?;
        row.map(|r| self.decode(&r)).transpose()
    }

    /// Row (snake_case columns) to entity via its camelCase serde form.
    fn decode(&self, row: &PgRow) -> Result<T, AppError> {
        use sqlx::{Column, Row};
        let mut map = Map::new();
        for col in row.columns() {
            let name = col.name();
            let field = self
                .table
                .by_column(name)
                .map(|c| c.field.clone())
                .unwrap_or_else(|| to_camel_case(name));
            map.insert(field, cell_to_value(row, name));
        }
        serde_json::from_value(Value::Object(map))
            .map_err(|e| AppError::Internal(format!("decode {} row: {}", T::NAME, e)))
    }
}

#[async_trait]
impl<T: Resource> Repository<T> for PgRepository<T> {
    async fn count(&self, spec: &QuerySpec) -> Result<u64, AppError> {
        use sqlx::Row;
        let q = sql::count(&self.table, spec);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = Self::bind(&q).fetch_one(&self.pool).await?;
        let n: i64 = row.try_get(0)?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    async fn fetch_page(&self, spec: &QuerySpec) -> Result<Vec<T>, AppError> {
        let q = sql::select_page(&self.table, spec);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = Self::bind(&q).fetch_all(&self.pool).await?;
        rows.iter().map(|r| self.decode(r)).collect()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, AppError> {
        let q = sql::select_by_id(&self.table, Value::String(id.to_string()));
        self.fetch_optional(&q).await
    }

    async fn save(&self, entity: T) -> Result<T, AppError> {
        let value = serde_json::to_value(&entity)
            .map_err(|e| AppError::Internal(format!("serialize {}: {}", T::NAME, e)))?;
        let Value::Object(row) = value else {
            return Err(AppError::Internal(format!("{} must serialize to an object", T::NAME)));
        };
        let q = sql::upsert(&self.table, &row);
        match self.fetch_optional(&q).await? {
            Some(saved) => Ok(saved),
            // ON CONFLICT DO NOTHING on a table with only an id column
            None => Ok(entity),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let q = sql::delete(&self.table, Value::String(id.to_string()));
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = Self::bind(&q).fetch_optional(&self.pool).await?;
        Ok(row.is_some())
    }
}

/// Unique and foreign-key violations become domain failures naming the field;
/// everything else passes through.
fn map_db_error(err: sqlx::Error, resource: &str, table: &TableDef) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() || db.is_foreign_key_violation() {
            let field = db
                .constraint()
                .and_then(|c| field_from_constraint(c, table))
                .or_else(|| {
                    db.try_downcast_ref::<PgDatabaseError>()
                        .and_then(|pg| pg.detail())
                        .and_then(|d| field_from_detail(d, table))
                })
                .unwrap_or_else(|| "field".to_string());
            if db.is_unique_violation() {
                tracing::warn!(resource, field = %field, "unique violation");
                return AppError::duplicate(resource, &field);
            }
            tracing::warn!(resource, field = %field, "foreign key violation");
            return AppError::missing_reference(&field);
        }
    }
    AppError::Db(err)
}

/// `users_phone_number_key` -> `phoneNumber` for table `users`.
pub fn field_from_constraint(constraint: &str, table: &TableDef) -> Option<String> {
    let prefix = format!("{}_", table.table);
    let rest = constraint.strip_prefix(&prefix).unwrap_or(constraint);
    let column = ["_key", "_unique", "_idx", "_uq", "_fkey"]
        .iter()
        .find_map(|suffix| rest.strip_suffix(suffix))
        .unwrap_or(rest);
    if column.is_empty() {
        return None;
    }
    Some(
        table
            .by_column(column)
            .map(|c| c.field.clone())
            .unwrap_or_else(|| to_camel_case(column)),
    )
}

/// `Key (email)=(a@b.c) already exists.` -> `email`.
pub fn field_from_detail(detail: &str, table: &TableDef) -> Option<String> {
    static KEY: OnceLock<Option<Regex>> = OnceLock::new();
    let re = KEY.get_or_init(|| Regex::new(r"Key \(([^)]+)\)=").ok()).as_ref()?;
    let column = re.captures(detail)?.get(1)?.as_str().trim().to_string();
    Some(
        table
            .by_column(&column)
            .map(|c| c.field.clone())
            .unwrap_or_else(|| to_camel_case(&column)),
    )
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<serde_json::Value>, _>(name) {
        return j;
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> TableDef {
        TableDef::new("public", "users")
            .column("id", "uuid")
            .column("email", "text")
            .column("phoneNumber", "text")
    }

    #[test]
    fn field_from_postgres_constraint_names() {
        assert_eq!(field_from_constraint("users_email_key", &users()).as_deref(), Some("email"));
        assert_eq!(
            field_from_constraint("users_phone_number_key", &users()).as_deref(),
            Some("phoneNumber")
        );
    }

    #[test]
    fn field_from_foreign_key_constraint() {
        let posts = TableDef::new("public", "posts").column("id", "uuid").column("ownerId", "uuid");
        assert_eq!(field_from_constraint("posts_owner_id_fkey", &posts).as_deref(), Some("ownerId"));
        let detail = r#"Key (owner_id)=(7f0c) is not present in table "users"."#;
        assert_eq!(field_from_detail(detail, &posts).as_deref(), Some("ownerId"));
    }

    #[test]
    fn field_from_violation_detail() {
        let detail = "Key (phone_number)=(+15550001111) already exists.";
        assert_eq!(field_from_detail(detail, &users()).as_deref(), Some("phoneNumber"));
        assert_eq!(field_from_detail("no key here", &users()), None);
    }
}
