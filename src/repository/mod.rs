//! Persistence seam. Services and the query executor only see [`Repository`];
//! the backend is chosen by handing them a different implementation.

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::{field_from_constraint, field_from_detail, PgRepository};

use crate::error::AppError;
use crate::query::QuerySpec;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// An entity stored behind a [`Repository`]. Its serde form (camelCase keys)
/// is what filters, search and sort operate on.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Singular name used in messages, e.g. "User".
    const NAME: &'static str;

    fn id(&self) -> Uuid;
}

#[async_trait]
pub trait Repository<T: Send + 'static>: Send + Sync {
    /// Rows matching filters and search, ignoring paging.
    async fn count(&self, spec: &QuerySpec) -> Result<u64, AppError>;

    /// One sorted page of matching rows.
    async fn fetch_page(&self, spec: &QuerySpec) -> Result<Vec<T>, AppError>;

    /// Page and total, read concurrently. The two reads are not mutually
    /// consistent under concurrent writes.
    async fn find(&self, spec: &QuerySpec) -> Result<(Vec<T>, u64), AppError> {
        tokio::try_join!(self.fetch_page(spec), self.count(spec))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, AppError>;

    /// Insert or replace by id. Unique-field clashes surface as `AppError::Conflict`.
    async fn save(&self, entity: T) -> Result<T, AppError>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}
