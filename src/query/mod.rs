//! Resource-agnostic pagination, search and sort.

mod executor;
mod page;
mod spec;
pub use executor::QueryExecutor;
pub use page::{PageMeta, PaginatedResult};
pub use spec::{QuerySpec, SortOrder, DEFAULT_PAGE};
