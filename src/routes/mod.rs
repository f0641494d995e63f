//! Router assembly. Layers, outermost first: audit, error normalizer,
//! principal attachment, body limit, panic catcher; the access guard sits on
//! the resource routes themselves so it sees the matched route template.

mod common;
mod posts;
mod users;

pub use common::{common_routes, ready_routes};
pub use posts::{post_capabilities, post_routes};
pub use users::{user_capabilities, user_routes};

use crate::audit::audit;
use crate::extractors::{attach_principal, Authenticator};
use crate::guard::enforce_capabilities;
use crate::normalizer::{normalize_errors, panic_response, route_not_found};
use crate::state::AppState;
use axum::{middleware::from_fn_with_state, Router};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;

/// Users, posts, health and version behind the full pipeline.
pub fn app_router(state: AppState, authenticator: Arc<dyn Authenticator>) -> Router {
    build(state, authenticator, Router::new())
}

/// [`app_router`] plus GET /ready checking `pool`.
pub fn app_router_with_ready(state: AppState, authenticator: Arc<dyn Authenticator>, pool: PgPool) -> Router {
    build(state, authenticator, ready_routes(pool))
}

fn build(state: AppState, authenticator: Arc<dyn Authenticator>, extra: Router) -> Router {
    let settings = Arc::clone(&state.settings);
    let capabilities = Arc::new(user_capabilities().merge(post_capabilities()));
    Router::new()
        .merge(user_routes(state.clone()))
        .merge(post_routes(state))
        .route_layer(from_fn_with_state(capabilities, enforce_capabilities))
        .merge(common_routes())
        .merge(extra)
        .fallback(route_not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(RequestBodyLimitLayer::new(settings.request_body_limit))
        .layer(from_fn_with_state(authenticator, attach_principal))
        .layer(from_fn_with_state(Arc::clone(&settings), normalize_errors))
        .layer(from_fn_with_state(settings, audit))
}
