//! Attach the authenticated caller to the request and read it back in handlers.

use crate::guard::{Principal, Role};
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

pub const PRINCIPAL_ID_HEADER: &str = "X-Principal-Id";
pub const PRINCIPAL_ROLE_HEADER: &str = "X-Principal-Role";

/// Turns request headers into the caller's identity, if any.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap) -> Option<Principal>;
}

/// Trusts `X-Principal-Id` / `X-Principal-Role` as sent. Development and tests only.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeaderAuthenticator;

impl Authenticator for HeaderAuthenticator {
    fn authenticate(&self, headers: &HeaderMap) -> Option<Principal> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };
        let id = Uuid::parse_str(header(PRINCIPAL_ID_HEADER)?).ok()?;
        let role = header(PRINCIPAL_ROLE_HEADER)?.parse::<Role>().ok()?;
        Some(Principal { id, role })
    }
}

/// Stores the authenticated principal in request extensions for the guard and handlers.
pub async fn attach_principal(
    State(authenticator): State<Arc<dyn Authenticator>>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(principal) = authenticator.authenticate(req.headers()) {
        tracing::debug!(principal_id = %principal.id, role = %principal.role, "principal attached");
        req.extensions_mut().insert(principal);
    }
    next.run(req).await
}

/// Principal attached by [`attach_principal`], if any.
#[derive(Clone, Copy, Debug)]
pub struct CurrentPrincipal(pub Option<Principal>);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentPrincipal(parts.extensions.get::<Principal>().copied()))
    }
}
