//! Structured audit log of every request, with secrets redacted.
//!
//! Emits one record per phase: `request` on entry, then either `response`
//! or `error` once the inner service has answered. Bodies are only buffered
//! when their exact length is known and under the configured cap, so the
//! logger never changes what the handler receives.

use crate::config::{AuditSettings, Settings};
use crate::error::Failure;
use crate::normalizer::resolve_message;
use axum::{
    body::{to_bytes, Body, HttpBody},
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Instant;

pub const REDACTED: &str = "[REDACTED]";
pub const TRUNCATED_MESSAGE: &str = "Response data truncated due to size";

static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Correlation id of the current request, `req_<32 hex chars>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        RequestId(format!("req_{}", uuid::Uuid::new_v4().simple()))
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestId {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestId>()
            .cloned()
            .unwrap_or_else(RequestId::generate))
    }
}

/// Header map as a JSON object with sensitive values replaced.
pub fn redact_headers(headers: &HeaderMap, sensitive: &[String]) -> Value {
    let mut out = Map::new();
    for name in headers.keys() {
        let key = name.as_str();
        let value = if sensitive.iter().any(|s| s.eq_ignore_ascii_case(key)) {
            REDACTED.to_string()
        } else {
            headers
                .get_all(name)
                .iter()
                .map(|v| v.to_str().unwrap_or("<binary>"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        out.insert(key.to_string(), Value::String(value));
    }
    Value::Object(out)
}

fn is_sensitive_key(key: &str, sensitive: &[String]) -> bool {
    let folded: String = key
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect();
    sensitive.iter().any(|s| folded.contains(s.as_str()))
}

/// Replaces the value of every sensitive key, at any depth.
pub fn redact_body(value: Value, sensitive: &[String]) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    if is_sensitive_key(&k, sensitive) {
                        (k, Value::String(REDACTED.to_string()))
                    } else {
                        (k, redact_body(v, sensitive))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(|v| redact_body(v, sensitive)).collect()),
        other => other,
    }
}

/// Payloads whose serialized form exceeds `limit` characters become a preview.
pub fn truncate_payload(value: Value, limit: usize) -> Value {
    let serialized = value.to_string();
    if serialized.chars().count() <= limit {
        return value;
    }
    let preview: String = serialized.chars().take(limit).collect();
    json!({
        "message": TRUNCATED_MESSAGE,
        "preview": format!("{}...", preview),
    })
}

/// Reads the body only when its exact length is known and within `cap`.
/// Returns the body to pass on and its JSON form, if it had one.
async fn buffer_json(body: Body, cap: usize) -> (Body, Option<Value>) {
    match body.size_hint().exact() {
        Some(len) if len > 0 && len <= cap as u64 => match to_bytes(body, cap).await {
            Ok(bytes) => {
                let parsed = serde_json::from_slice::<Value>(&bytes).ok();
                (Body::from(bytes), parsed)
            }
            Err(err) => {
                tracing::debug!(error = %err, "body not readable for audit");
                (Body::empty(), None)
            }
        },
        _ => (body, None),
    }
}

fn error_message(response: &Response, data: Option<&Value>) -> String {
    match response.extensions().get::<Failure>() {
        Some(failure) => resolve_message(failure.payload.as_ref()),
        None => resolve_message(data.and_then(|d| d.get("message"))),
    }
}

/// Outermost middleware: assigns the correlation id and logs both phases.
pub async fn audit(State(settings): State<Arc<Settings>>, req: Request, next: Next) -> Response {
    let started = Instant::now();
    let rules: &AuditSettings = &settings.audit;
    let request_id = RequestId::generate();

    let (mut parts, body) = req.into_parts();
    let (body, request_body) = buffer_json(body, rules.body_buffer_limit).await;
    let method = parts.method.to_string();
    let path = parts.uri.path().to_string();

    let logged_headers = redact_headers(&parts.headers, &rules.sensitive_headers);
    let logged_body = request_body
        .map(|b| redact_body(b, &rules.sensitive_fields))
        .unwrap_or(Value::Null);
    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        headers = %logged_headers,
        body = %logged_body,
        "request"
    );

    parts.extensions.insert(request_id.clone());
    let response = next.run(Request::from_parts(parts, body)).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let buffer_response = settings.environment.is_development() || status.is_client_error() || status.is_server_error();
    let (parts, body) = response.into_parts();
    let (body, data) = if buffer_response {
        buffer_json(body, rules.body_buffer_limit).await
    } else {
        (body, None)
    };
    let mut response = Response::from_parts(parts, body);

    if status.is_client_error() || status.is_server_error() {
        tracing::warn!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            elapsed_ms,
            message = %error_message(&response, data.as_ref()),
            "error"
        );
    } else if settings.environment.is_development() {
        let preview = data
            .map(|d| truncate_payload(redact_body(d, &rules.sensitive_fields), rules.payload_limit))
            .unwrap_or(Value::Null);
        tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            elapsed_ms,
            data = %preview,
            "response"
        );
    } else {
        tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            elapsed_ms,
            "response"
        );
    }

    if let Ok(value) = HeaderValue::from_str(&request_id.0) {
        response.headers_mut().insert(X_REQUEST_ID.clone(), value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, StatusCode};
    use axum::{
        middleware::from_fn_with_state,
        routing::{get, post},
        Json, Router,
    };
    use tower::ServiceExt;

    fn rules() -> AuditSettings {
        AuditSettings::default()
    }

    #[test]
    fn redacts_sensitive_body_keys_at_any_depth() {
        let body = json!({
            "email": "a@b.c",
            "password": "secret123",
            "profile": { "api_token": "t", "items": [{ "credit-card": "4111" }] }
        });
        let out = redact_body(body, &rules().sensitive_fields);
        assert_eq!(out["password"], REDACTED);
        assert_eq!(out["email"], "a@b.c");
        assert_eq!(out["profile"]["api_token"], REDACTED);
        assert_eq!(out["profile"]["items"][0]["credit-card"], REDACTED);
    }

    #[test]
    fn redacts_sensitive_headers_case_insensitively() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        headers.insert("X-Api-Key", HeaderValue::from_static("k"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let out = redact_headers(&headers, &rules().sensitive_headers);
        assert_eq!(out["authorization"], REDACTED);
        assert_eq!(out["x-api-key"], REDACTED);
        assert_eq!(out["accept"], "application/json");
    }

    #[test]
    fn truncates_oversized_payloads() {
        let big = json!({ "text": "x".repeat(2000) });
        let out = truncate_payload(big, 1000);
        assert_eq!(out["message"], TRUNCATED_MESSAGE);
        assert_eq!(out["preview"].as_str().unwrap().chars().count(), 1003);

        let small = json!({ "text": "short" });
        assert_eq!(truncate_payload(small.clone(), 1000), small);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let out = truncate_payload(json!("é".repeat(50)), 10);
        assert!(out["preview"].as_str().unwrap().starts_with("\"éé"));
    }

    #[test]
    fn request_ids_are_prefixed_hex() {
        let id = RequestId::generate();
        assert!(id.0.starts_with("req_"));
        assert_eq!(id.0.len(), 36);
        assert_ne!(id, RequestId::generate());
    }

    #[tokio::test]
    async fn passes_bodies_through_and_tags_response() {
        let settings = Arc::new(Settings::default());
        let app = Router::new()
            .route("/echo", post(|Json(v): Json<Value>| async move { Json(v) }))
            .layer(from_fn_with_state(settings, audit));
        let req = Request::builder()
            .method("POST")
            .uri("/echo")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"password":"secret123","name":"n"}"#))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let id = res.headers().get("x-request-id").unwrap().to_str().unwrap().to_string();
        assert!(id.starts_with("req_"));
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let echoed: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(echoed["password"], "secret123");
    }

    #[tokio::test]
    async fn handlers_see_the_id_sent_back_in_the_header() {
        let settings = Arc::new(Settings::default());
        let app = Router::new()
            .route("/id", get(|id: RequestId| async move { id.0 }))
            .layer(from_fn_with_state(settings, audit));
        let req = Request::builder().uri("/id").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        let header = res.headers().get("x-request-id").unwrap().to_str().unwrap().to_string();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(std::str::from_utf8(&bytes).unwrap(), header);
    }
}
