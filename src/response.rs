//! Standard response envelopes.

use crate::error::FieldError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub const SUCCESS_MESSAGE: &str = "Success";

/// `{ status: true, statusCode, message, data }`. Handlers return this
/// directly, so each success body is wrapped exactly once.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub status: StatusCode,
    pub message: String,
    pub data: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuccessBody<'a, T> {
    status: bool,
    status_code: u16,
    message: &'a str,
    data: &'a T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            status: StatusCode::OK,
            message: SUCCESS_MESSAGE.to_string(),
            data,
        }
    }

    pub fn created(data: T) -> Self {
        ApiResponse {
            status: StatusCode::CREATED,
            ..Self::ok(data)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = SuccessBody {
            status: true,
            status_code: self.status.as_u16(),
            message: &self.message,
            data: &self.data,
        };
        (self.status, Json(body)).into_response()
    }
}

/// `{ status: false, statusCode, message, timestamp, path, method, errors?, stack? }`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub status: bool,
    pub status_code: u16,
    pub message: String,
    pub timestamp: String,
    pub path: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl IntoResponse for ErrorEnvelope {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
