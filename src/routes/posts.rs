use crate::guard::{CapabilityTable, RouteCapability};
use crate::handlers::posts::{create, list, read, remove, update};
use crate::state::AppState;
use axum::{http::Method, routing::get, Router};

pub fn post_routes(state: AppState) -> Router {
    Router::new()
        .route("/posts", get(list).post(create))
        .route("/posts/:id", get(read).patch(update).delete(remove))
        .with_state(state)
}

pub fn post_capabilities() -> CapabilityTable {
    CapabilityTable::new()
        .require(Method::POST, "/posts", RouteCapability::authenticated())
        .require(Method::PATCH, "/posts/:id", RouteCapability::authenticated())
        .require(Method::DELETE, "/posts/:id", RouteCapability::authenticated())
}
