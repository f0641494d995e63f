//! Resource services: normalize and validate input, then drive the repository.

mod collaborators;
mod posts;
mod users;
pub mod validation;

pub use collaborators::{Argon2Hasher, E164PhoneValidator, Hasher, PhoneValidator};
pub use posts::PostService;
pub use users::UserService;
pub use validation::{normalize_field, normalize_phone, FieldRule, FieldRules, Format, RequestValidator};

use crate::error::AppError;
use crate::query::{PaginatedResult, QueryExecutor, QuerySpec};
use crate::repository::Repository;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Paginated read, bounded by the store timeout when one is configured and
/// abandoned with 503 once `cancel` fires.
async fn run_query<T: Send + 'static>(
    spec: &QuerySpec,
    repo: &dyn Repository<T>,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<PaginatedResult<T>, AppError> {
    match timeout {
        Some(t) => {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(AppError::Cancelled),
                result = QueryExecutor::execute_until(spec, repo, Instant::now() + t) => result,
            }
        }
        None => QueryExecutor::execute_cancellable(spec, repo, cancel).await,
    }
}

fn into_object(body: Value) -> Result<Map<String, Value>, AppError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

/// Typed DTO from an already validated body.
fn decode<T: serde::de::DeserializeOwned>(body: Map<String, Value>) -> Result<T, AppError> {
    serde_json::from_value(Value::Object(body)).map_err(|e| AppError::BadRequest(e.to_string()))
}
