//! Builds parameterized SELECT, COUNT, upsert and DELETE statements from a table descriptor.

use crate::query::QuerySpec;
use crate::sql::TableDef;
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from table descriptors).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified_table(table: &TableDef) -> String {
    format!("{}.{}", quoted(&table.schema), quoted(&table.table))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }
}

/// Escape LIKE metacharacters so a search term only ever matches literally.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn select_column_list(table: &TableDef) -> String {
    table
        .columns
        .iter()
        .map(|c| quoted(&c.column))
        .collect::<Vec<_>>()
        .join(", ")
}

/// WHERE for equality filters AND (search OR ...). Unknown fields are skipped.
fn where_clause(table: &TableDef, spec: &QuerySpec, q: &mut QueryBuf) -> String {
    let mut parts = Vec::new();
    for (field, value) in &spec.filters {
        let Some(col) = table.by_field(field) else { continue };
        let n = q.push_param(Value::String(value.clone()));
        parts.push(format!("{}::text = ${}", quoted(&col.column), n));
    }
    if let Some(term) = spec.search_term.as_deref() {
        let cols: Vec<_> = spec.search_fields.iter().filter_map(|f| table.by_field(f)).collect();
        if !cols.is_empty() {
            let n = q.push_param(Value::String(format!("%{}%", escape_like(term))));
            let ors = cols
                .iter()
                .map(|c| format!("{}::text ILIKE ${} ESCAPE '\\'", quoted(&c.column), n))
                .collect::<Vec<_>>()
                .join(" OR ");
            parts.push(format!("({})", ors));
        }
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT one page: filters, search, ORDER BY the requested field, LIMIT/OFFSET.
pub fn select_page(table: &TableDef, spec: &QuerySpec) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(table, spec, &mut q);
    let sort_col = table
        .by_field(&spec.sort_by)
        .or_else(|| table.id_column())
        .map(|c| quoted(&c.column));
    let order_clause = sort_col
        .map(|c| format!(" ORDER BY {} {}", c, spec.sort_order.as_sql()))
        .unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{}{} LIMIT {} OFFSET {}",
        select_column_list(table),
        qualified_table(table),
        where_sql,
        order_clause,
        spec.limit,
        spec.offset()
    );
    q
}

/// COUNT(*) over the same filters and search as [`select_page`], without paging.
pub fn count(table: &TableDef, spec: &QuerySpec) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(table, spec, &mut q);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", qualified_table(table), where_sql);
    q
}

fn id_predicate(table: &TableDef, q: &mut QueryBuf, id: Value) -> String {
    let n = q.push_param(id);
    match table.id_column() {
        Some(c) => format!("{} = ${}::{}", quoted(&c.column), n, c.pg_type),
        None => format!("{} = ${}", quoted("id"), n),
    }
}

pub fn select_by_id(table: &TableDef, id: Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pred = id_predicate(table, &mut q, id);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {}",
        select_column_list(table),
        qualified_table(table),
        pred
    );
    q
}

/// INSERT ... ON CONFLICT (id) DO UPDATE for every declared column present in `row`.
/// `row` is keyed by API field name.
pub fn upsert(table: &TableDef, row: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    let mut sets = Vec::new();
    for c in &table.columns {
        let Some(val) = row.get(&c.field) else { continue };
        let n = q.push_param(val.clone());
        cols.push(quoted(&c.column));
        placeholders.push(format!("${}::{}", n, c.pg_type));
        if c.field != table.id_field {
            sets.push(format!("{col} = EXCLUDED.{col}", col = quoted(&c.column)));
        }
    }
    let id_col = table
        .id_column()
        .map(|c| quoted(&c.column))
        .unwrap_or_else(|| quoted("id"));
    let conflict = if sets.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", sets.join(", "))
    };
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) {} RETURNING {}",
        qualified_table(table),
        cols.join(", "),
        placeholders.join(", "),
        id_col,
        conflict,
        select_column_list(table)
    );
    q
}

/// DELETE by id, returning the id so callers can tell whether a row existed.
pub fn delete(table: &TableDef, id: Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pred = id_predicate(table, &mut q, id);
    q.sql = format!("DELETE FROM {} WHERE {} RETURNING 1", qualified_table(table), pred);
    q
}
