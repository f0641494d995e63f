use super::{json_body, parse_id, query_params};
use crate::error::AppError;
use crate::models::UserView;
use crate::query::PaginatedResult;
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Path, Query, State};
use serde_json::Value;
use std::collections::HashMap;

pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<ApiResponse<UserView>, AppError> {
    let user = state.users.create(json_body(body)?).await?;
    Ok(ApiResponse::created(user))
}

pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<ApiResponse<PaginatedResult<UserView>>, AppError> {
    let params = query_params(query)?;
    Ok(ApiResponse::ok(state.users.list(&params).await?))
}

pub async fn search(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<ApiResponse<UserView>, AppError> {
    let params = query_params(query)?;
    let phone = params.get("phoneNumber").map(String::as_str).unwrap_or("");
    Ok(ApiResponse::ok(state.users.find_by_phone(phone).await?))
}

pub async fn read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<UserView>, AppError> {
    Ok(ApiResponse::ok(state.users.get(parse_id(&id)?).await?))
}

pub async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> Result<ApiResponse<()>, AppError> {
    state.users.delete(parse_id(&id)?).await?;
    Ok(ApiResponse::ok(()).with_message("User deleted successfully"))
}
