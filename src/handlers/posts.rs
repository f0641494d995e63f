use super::{json_body, parse_id, query_params, require_principal};
use crate::error::AppError;
use crate::extractors::CurrentPrincipal;
use crate::models::Post;
use crate::query::PaginatedResult;
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Path, Query, State};
use serde_json::Value;
use std::collections::HashMap;

pub async fn create(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<ApiResponse<Post>, AppError> {
    let principal = require_principal(principal)?;
    let post = state.posts.create(&principal, json_body(body)?).await?;
    Ok(ApiResponse::created(post))
}

pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<ApiResponse<PaginatedResult<Post>>, AppError> {
    let params = query_params(query)?;
    Ok(ApiResponse::ok(state.posts.list(&params).await?))
}

pub async fn read(State(state): State<AppState>, Path(id): Path<String>) -> Result<ApiResponse<Post>, AppError> {
    Ok(ApiResponse::ok(state.posts.get(parse_id(&id)?).await?))
}

pub async fn update(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<ApiResponse<Post>, AppError> {
    let principal = require_principal(principal)?;
    let id = parse_id(&id)?;
    let post = state.posts.update(&principal, id, json_body(body)?).await?;
    Ok(ApiResponse::ok(post))
}

pub async fn remove(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, AppError> {
    let principal = require_principal(principal)?;
    state.posts.delete(&principal, parse_id(&id)?).await?;
    Ok(ApiResponse::ok(()).with_message("Post deleted successfully"))
}
