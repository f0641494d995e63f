use crate::guard::{CapabilityTable, Role, RouteCapability};
use crate::handlers::users::{create, list, read, remove, search};
use crate::state::AppState;
use axum::{http::Method, routing::get, Router};

pub fn user_routes(state: AppState) -> Router {
    Router::new()
        .route("/users", get(list).post(create))
        .route("/users/search", get(search))
        .route("/users/:id", get(read).delete(remove))
        .with_state(state)
}

pub fn user_capabilities() -> CapabilityTable {
    CapabilityTable::new().require(
        Method::DELETE,
        "/users/:id",
        RouteCapability::roles(&[Role::Admin, Role::Manager]),
    )
}
