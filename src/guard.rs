//! Role-based access guard driven by an explicit per-route capability table.

use crate::error::AppError;
use axum::{
    extract::{MatchedPath, Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Manager,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Manager => "MANAGER",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "MANAGER" => Ok(Role::Manager),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Authenticated caller, attached to the request before the guard runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

/// Roles allowed to invoke a route. An empty set means the route is public.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteCapability {
    roles: Vec<Role>,
}

impl RouteCapability {
    pub fn public() -> Self {
        RouteCapability::default()
    }

    pub fn roles(roles: &[Role]) -> Self {
        let mut out: Vec<Role> = Vec::with_capacity(roles.len());
        for r in roles {
            if !out.contains(r) {
                out.push(*r);
            }
        }
        RouteCapability { roles: out }
    }

    /// Any authenticated principal.
    pub fn authenticated() -> Self {
        Self::roles(&[Role::User, Role::Manager, Role::Admin])
    }

    pub fn is_declared(&self) -> bool {
        !self.roles.is_empty()
    }

    pub fn allows(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Per-request decision. Undeclared capabilities allow everyone.
pub fn authorize(principal: Option<&Principal>, capability: &RouteCapability) -> Result<(), AppError> {
    if !capability.is_declared() {
        return Ok(());
    }
    let Some(principal) = principal else {
        return Err(AppError::Forbidden("No user found in request".into()));
    };
    if capability.allows(principal.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden("You are not allowed to perform this action".into()))
    }
}

/// `(method, route template)` to required roles, e.g. `(DELETE, "/users/:id")`.
#[derive(Clone, Debug, Default)]
pub struct CapabilityTable {
    entries: HashMap<(Method, String), RouteCapability>,
}

impl CapabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, method: Method, route: &str, capability: RouteCapability) -> Self {
        self.entries.insert((method, route.to_string()), capability);
        self
    }

    pub fn merge(mut self, other: CapabilityTable) -> Self {
        self.entries.extend(other.entries);
        self
    }

    /// Routes missing from the table are public.
    pub fn lookup(&self, method: &Method, route: &str) -> RouteCapability {
        self.entries
            .get(&(method.clone(), route.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

/// Route layer enforcing the table against the principal in request extensions.
pub async fn enforce_capabilities(
    State(table): State<Arc<CapabilityTable>>,
    matched: Option<MatchedPath>,
    req: Request,
    next: Next,
) -> Response {
    let route = matched
        .as_ref()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let capability = table.lookup(req.method(), &route);
    let principal = req.extensions().get::<Principal>().copied();
    match authorize(principal.as_ref(), &capability) {
        Ok(()) => next.run(req).await,
        Err(err) => {
            tracing::debug!(
                method = %req.method(),
                route = %route,
                role = ?principal.map(|p| p.role),
                "access denied"
            );
            err.into_response()
        }
    }
}
