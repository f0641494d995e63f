//! Turns every failure into the error envelope.
//!
//! Handlers, extractors, the fallback route and the panic catcher all end in
//! an error-status response. Those tagged with a [`Failure`] are rendered
//! from it; untagged ones have their body read back as the declared payload.

use crate::audit::RequestId;
use crate::config::{Environment, Settings};
use crate::error::{AppError, Failure, FailureKind};
use crate::response::ErrorEnvelope;
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, Method, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

pub const FALLBACK_MESSAGE: &str = "Something went wrong";

/// Declared string, else the `message` of a declared object, else the fallback.
pub fn resolve_message(payload: Option<&Value>) -> String {
    match payload {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Object(map)) => match map.get("message") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            _ => FALLBACK_MESSAGE.to_string(),
        },
        _ => FALLBACK_MESSAGE.to_string(),
    }
}

pub fn normalize(failure: &Failure, method: &str, path: &str, environment: Environment) -> ErrorEnvelope {
    let status = failure.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let errors = match failure.kind {
        FailureKind::Validation => Some(failure.errors.clone()),
        _ => None,
    };
    let stack = if environment.is_development() {
        failure.detail.clone()
    } else {
        None
    };
    ErrorEnvelope {
        status: false,
        status_code: status.as_u16(),
        message: resolve_message(failure.payload.as_ref()),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        path: path.to_string(),
        method: method.to_string(),
        errors,
        stack,
    }
}

/// Failure for an error response nobody tagged: JSON body, plain text body,
/// or the status reason when the body is empty or unreadable.
async fn failure_from_body(status: StatusCode, body: Body, limit: usize) -> Failure {
    let payload = match to_bytes(body, limit).await {
        Ok(bytes) if !bytes.is_empty() => serde_json::from_slice::<Value>(&bytes)
            .ok()
            .or_else(|| std::str::from_utf8(&bytes).ok().map(|s| Value::String(s.trim().to_string()))),
        _ => None,
    };
    let payload = payload.or_else(|| status.canonical_reason().map(|r| Value::String(r.to_string())));
    Failure {
        kind: if status.is_server_error() {
            FailureKind::Unclassified
        } else {
            FailureKind::Domain
        },
        status: Some(status),
        detail: payload.as_ref().map(|p| p.to_string()),
        payload,
        errors: Vec::new(),
    }
}

/// Middleware rendering every error-status response as an [`ErrorEnvelope`].
pub async fn normalize_errors(
    State(settings): State<Arc<Settings>>,
    request_id: RequestId,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let response = next.run(req).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let failure = match parts.extensions.remove::<Failure>() {
        Some(failure) => failure,
        None => failure_from_body(status, body, settings.audit.body_buffer_limit).await,
    };
    let envelope = normalize(&failure, &method, &path, settings.environment);

    if status.is_server_error() {
        tracing::error!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = envelope.status_code,
            message = %envelope.message,
            detail = failure.detail.as_deref().unwrap_or(""),
            "request failed"
        );
    } else {
        tracing::warn!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = envelope.status_code,
            message = %envelope.message,
            "request rejected"
        );
    }

    let mut rendered = envelope.into_response();
    for (name, value) in parts.headers.iter() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            rendered.headers_mut().insert(name.clone(), value.clone());
        }
    }
    rendered.extensions_mut().insert(failure);
    rendered
}

/// Fallback for unmatched routes.
pub async fn route_not_found(method: Method, uri: Uri) -> AppError {
    AppError::NotFound(format!("Cannot {} {}", method, uri.path()))
}

/// Response for a caught panic; the normalizer renders it as a 500.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    AppError::Internal(format!("handler panicked: {}", message)).into_response()
}
