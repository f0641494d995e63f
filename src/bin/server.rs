//! HTTP server: reads settings from the environment (and `.env`), prepares
//! the database, wires PostgreSQL-backed services and serves the pipeline.

use crud_pipeline::models::{post, user};
use crud_pipeline::{
    app_router_with_ready, ensure_database_exists, ensure_tables, validate_resource, AppState, Argon2Hasher,
    E164PhoneValidator, HeaderAuthenticator, PgRepository, PostService, Settings, UserService,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::from_default_env().add_directive("crud_pipeline=info".parse()?);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let settings = Arc::new(Settings::from_env()?);
    tracing::info!(environment = ?settings.environment, sort_policy = ?settings.sort_policy, "settings loaded");

    let users_query = user::query_config().sort_policy(settings.sort_policy);
    let posts_query = post::query_config().sort_policy(settings.sort_policy);
    validate_resource(&users_query)?;
    validate_resource(&posts_query)?;

    ensure_database_exists(&settings.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .connect(&settings.database_url)
        .await?;
    ensure_tables(&pool, &settings.db_schema).await?;

    let shutdown = CancellationToken::new();
    let phone = Arc::new(E164PhoneValidator);
    let users = UserService::new(
        Arc::new(PgRepository::new(pool.clone(), user::table(&settings.db_schema))),
        Arc::new(Argon2Hasher),
        phone.clone(),
    )
    .with_query_config(users_query)
    .with_store_timeout(settings.store_timeout)
    .with_cancellation(shutdown.clone());
    let posts = PostService::new(
        Arc::new(PgRepository::new(pool.clone(), post::table(&settings.db_schema))),
        phone,
    )
    .with_query_config(posts_query)
    .with_store_timeout(settings.store_timeout)
    .with_cancellation(shutdown.clone());

    let state = AppState {
        users,
        posts,
        settings: Arc::clone(&settings),
    };
    let app = app_router_with_ready(state, Arc::new(HeaderAuthenticator), pool);

    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down, cancelling in-flight queries");
            shutdown.cancel();
        })
        .await?;
    Ok(())
}
