//! HTTP handlers for users and posts.

pub mod posts;
pub mod users;

use crate::error::AppError;
use crate::guard::Principal;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest("Validation failed (uuid is expected)".into()))
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    body.map(|Json(v)| v).map_err(|e| AppError::Rejected(e.status(), e.body_text()))
}

fn query_params(
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<HashMap<String, String>, AppError> {
    query.map(|Query(q)| q).map_err(|e| AppError::Rejected(e.status(), e.body_text()))
}

fn require_principal(principal: Option<Principal>) -> Result<Principal, AppError> {
    principal.ok_or_else(|| AppError::Forbidden("No user found in request".into()))
}
