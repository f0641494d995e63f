//! Code-declared table descriptors. SQL identifiers only ever come from here.

use crate::case::to_snake_case;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDef {
    /// API (camelCase) field name.
    pub field: String,
    /// SQL column name.
    pub column: String,
    /// PostgreSQL type used to cast bound text parameters.
    pub pg_type: String,
}

#[derive(Clone, Debug)]
pub struct TableDef {
    pub schema: String,
    pub table: String,
    /// Field holding the primary key.
    pub id_field: String,
    pub columns: Vec<ColumnDef>,
}

impl TableDef {
    pub fn new(schema: &str, table: &str) -> Self {
        TableDef {
            schema: schema.to_string(),
            table: table.to_string(),
            id_field: "id".to_string(),
            columns: Vec::new(),
        }
    }

    /// Add a column whose SQL name is the snake_case form of `field`.
    pub fn column(mut self, field: &str, pg_type: &str) -> Self {
        self.columns.push(ColumnDef {
            field: field.to_string(),
            column: to_snake_case(field),
            pg_type: pg_type.to_string(),
        });
        self
    }

    pub fn by_field(&self, field: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.field == field)
    }

    pub fn by_column(&self, column: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.column == column)
    }

    pub fn id_column(&self) -> Option<&ColumnDef> {
        self.by_field(&self.id_field)
    }
}
