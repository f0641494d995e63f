#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use crud_pipeline::models::{user, Post, User};
use crud_pipeline::{
    app_router, AppError, AppState, E164PhoneValidator, Environment, Hasher, HeaderAuthenticator,
    InMemoryRepository, PostService, Settings, UserService,
};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use uuid::Uuid;

/// Cheap stand-in so tests don't pay for argon2.
pub struct PlainHasher;

impl Hasher for PlainHasher {
    fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        Ok(format!("plain:{}", plaintext))
    }
}

pub fn app_with(settings: Settings) -> Router {
    app_with_cancellation(settings, CancellationToken::new())
}

pub fn app_with_cancellation(settings: Settings, cancel: CancellationToken) -> Router {
    let phone = Arc::new(E164PhoneValidator);
    let users = UserService::new(
        Arc::new(InMemoryRepository::<User>::new().with_unique(user::UNIQUE_FIELDS)),
        Arc::new(PlainHasher),
        phone.clone(),
    )
    .with_cancellation(cancel.clone());
    let posts = PostService::new(Arc::new(InMemoryRepository::<Post>::new()), phone).with_cancellation(cancel);
    let state = AppState {
        users,
        posts,
        settings: Arc::new(settings),
    };
    app_router(state, Arc::new(HeaderAuthenticator))
}

pub fn app() -> Router {
    app_with(Settings::default())
}

pub fn dev_app() -> Router {
    app_with(Settings {
        environment: Environment::Development,
        ..Settings::default()
    })
}

/// Caller identity sent through the development header authenticator.
#[derive(Clone, Copy, Debug)]
pub struct Caller {
    pub id: Uuid,
    pub role: &'static str,
}

impl Caller {
    pub fn new(role: &'static str) -> Self {
        Caller { id: Uuid::new_v4(), role }
    }
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>, caller: Option<Caller>) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(c) = caller {
        builder = builder
            .header("X-Principal-Id", c.id.to_string())
            .header("X-Principal-Role", c.role);
    }
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    send_raw(app, builder.body(body).unwrap()).await
}

pub async fn send_raw(app: &Router, req: Request<Body>) -> Reply {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    Reply { status, headers, body }
}

pub fn new_user(n: u32) -> Value {
    serde_json::json!({
        "firstName": format!("First{}", n),
        "lastName": format!("Last{}", n),
        "email": format!("user{}@example.com", n),
        "phoneNumber": format!("+1415555{:04}", n),
        "password": "password123"
    })
}
