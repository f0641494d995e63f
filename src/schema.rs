//! Database and table bootstrap for the server binary.

use crate::error::{AppError, ConfigError};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;

/// Double-quoted identifier; only plain identifiers are accepted.
fn quote_ident(name: &str) -> Result<String, ConfigError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(ConfigError::Invalid {
            key: "identifier".into(),
            message: format!("'{}' is not a valid PostgreSQL identifier", name),
        });
    }
    Ok(format!("\"{}\"", name))
}

fn users_ddl(schema: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {schema}."users" (
            id UUID PRIMARY KEY,
            first_name VARCHAR(100) NOT NULL,
            last_name VARCHAR(100) NOT NULL,
            email VARCHAR(255) NOT NULL,
            phone_number VARCHAR(20) NOT NULL,
            role VARCHAR(16) NOT NULL DEFAULT 'USER',
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            password_hash VARCHAR(255) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT users_email_key UNIQUE (email),
            CONSTRAINT users_phone_number_key UNIQUE (phone_number)
        )
        "#
    )
}

fn posts_ddl(schema: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {schema}."posts" (
            id UUID PRIMARY KEY,
            title VARCHAR(255) NOT NULL,
            content TEXT NOT NULL,
            owner_id UUID NOT NULL CONSTRAINT posts_owner_id_fkey REFERENCES {schema}."users"(id) ON DELETE CASCADE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#
    )
}

fn index_ddl(schema: &str) -> Vec<String> {
    [
        ("idx_users_first_name", "users", "first_name"),
        ("idx_users_last_name", "users", "last_name"),
        ("idx_users_created_at", "users", "created_at"),
        ("idx_posts_title", "posts", "title"),
        ("idx_posts_owner_id", "posts", "owner_id"),
        ("idx_posts_created_at", "posts", "created_at"),
    ]
    .iter()
    .map(|(name, table, column)| {
        format!(
            r#"CREATE INDEX IF NOT EXISTS {name} ON {schema}."{table}" ({column})"#
        )
    })
    .collect()
}

/// Create the schema, the users and posts tables and their indexes if missing.
pub async fn ensure_tables(pool: &PgPool, schema: &str) -> Result<(), AppError> {
    let schema = quote_ident(schema)?;
    let mut statements = vec![
        format!("CREATE SCHEMA IF NOT EXISTS {}", schema),
        users_ddl(&schema),
        posts_ddl(&schema),
    ];
    statements.extend(index_ddl(&schema));
    for sql in &statements {
        tracing::debug!(sql = %sql.trim(), "ddl");
        sqlx::query(sql).execute(pool).await?;
    }
    tracing::info!(schema = %schema, "tables ready");
    Ok(())
}

/// Connect to the `postgres` database of the same server and create the
/// target database if it does not exist yet.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = split_database_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url).map_err(|e| ConfigError::Invalid {
        key: "DATABASE_URL".into(),
        message: e.to_string(),
    })?;
    let mut conn = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)?))
            .execute(&mut conn)
            .await?;
        tracing::info!(database = %db_name, "database created");
    }
    Ok(())
}

/// `postgres://h/app?sslmode=x` -> (`postgres://h/postgres`, `app`).
fn split_database_url(url: &str) -> Result<(String, String), ConfigError> {
    let path_start = url.rfind('/').ok_or_else(|| ConfigError::Invalid {
        key: "DATABASE_URL".into(),
        message: "missing database path".into(),
    })? + 1;
    let db_name = url[path_start..].split('?').next().unwrap_or("").trim().to_string();
    Ok((format!("{}postgres", &url[..path_start]), db_name))
}
