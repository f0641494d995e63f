//! CRUD pipeline: paginated search/sort queries over any repository, a
//! role-based route guard, response envelopes, error normalization and
//! redacted audit logging, wired into an axum REST service for users and posts.

pub mod audit;
pub mod case;
pub mod config;
pub mod error;
pub mod extractors;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod normalizer;
pub mod query;
pub mod repository;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;

pub use config::{validate_resource, Environment, ResourceQueryConfig, Settings, SortPolicy};
pub use error::{AppError, ConfigError, Failure, FailureKind, FieldError};
pub use extractors::{Authenticator, CurrentPrincipal, HeaderAuthenticator};
pub use guard::{authorize, CapabilityTable, Principal, Role, RouteCapability};
pub use query::{PageMeta, PaginatedResult, QueryExecutor, QuerySpec, SortOrder};
pub use repository::{InMemoryRepository, PgRepository, Repository, Resource};
pub use response::{ApiResponse, ErrorEnvelope};
pub use routes::{app_router, app_router_with_ready};
pub use schema::{ensure_database_exists, ensure_tables};
pub use service::{Argon2Hasher, E164PhoneValidator, Hasher, PhoneValidator, PostService, UserService};
pub use state::AppState;
