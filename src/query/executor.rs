//! Run a [`QuerySpec`] against any [`Repository`].

use crate::error::AppError;
use crate::query::{PaginatedResult, QuerySpec};
use crate::repository::Repository;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub struct QueryExecutor;

impl QueryExecutor {
    /// Filters, search, sort, then skip/take. `total` is a separate count and
    /// may disagree with `items` if rows change between the two reads.
    /// Store errors propagate unchanged; nothing is retried.
    pub async fn execute<T, R>(spec: &QuerySpec, repo: &R) -> Result<PaginatedResult<T>, AppError>
    where
        T: Send + 'static,
        R: Repository<T> + ?Sized,
    {
        let (items, total) = repo.find(spec).await?;
        tracing::debug!(
            total,
            returned = items.len(),
            page = spec.page,
            limit = spec.limit,
            sort_by = %spec.sort_by,
            "query executed"
        );
        Ok(PaginatedResult::new(items, total, spec.page, spec.limit))
    }

    /// [`Self::execute`] bounded by `deadline`; the store future is dropped when it passes.
    pub async fn execute_until<T, R>(
        spec: &QuerySpec,
        repo: &R,
        deadline: Instant,
    ) -> Result<PaginatedResult<T>, AppError>
    where
        T: Send + 'static,
        R: Repository<T> + ?Sized,
    {
        match tokio::time::timeout_at(deadline, Self::execute(spec, repo)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::DeadlineExceeded),
        }
    }

    /// [`Self::execute`] abandoned as soon as `cancel` fires.
    pub async fn execute_cancellable<T, R>(
        spec: &QuerySpec,
        repo: &R,
        cancel: &CancellationToken,
    ) -> Result<PaginatedResult<T>, AppError>
    where
        T: Send + 'static,
        R: Repository<T> + ?Sized,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AppError::Cancelled),
            result = Self::execute(spec, repo) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceQueryConfig;
    use crate::repository::{InMemoryRepository, Resource};
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;
    use std::time::Duration;
    use uuid::Uuid;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Article {
        id: Uuid,
        title: String,
        content: String,
    }

    impl Resource for Article {
        const NAME: &'static str = "Article";
        fn id(&self) -> Uuid {
            self.id
        }
    }

    fn config() -> ResourceQueryConfig {
        ResourceQueryConfig::new("articles", "title")
            .sortable(&["title"])
            .searchable(&["title", "content"])
            .max_limit(50)
    }

    async fn store(matching: usize, other: usize) -> InMemoryRepository<Article> {
        let repo = InMemoryRepository::new();
        for i in 0..matching {
            let (title, content) = if i % 2 == 0 {
                (format!("Technology {:02}", i), "body".to_string())
            } else {
                (format!("Post {:02}", i), "all about TECHNOLOGY".to_string())
            };
            repo.save(Article { id: Uuid::new_v4(), title, content }).await.unwrap();
        }
        for i in 0..other {
            repo.save(Article {
                id: Uuid::new_v4(),
                title: format!("Gardening {}", i),
                content: "soil".into(),
            })
            .await
            .unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn paginates_search_results() {
        let repo = store(25, 7).await;
        let params: HashMap<String, String> = [("searchTerm", "technology"), ("page", "1"), ("limit", "10")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let spec = QuerySpec::from_params(&params, &config()).unwrap();
        let page = QueryExecutor::execute(&spec, &repo).await.unwrap();
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.meta.total, 25);
        assert_eq!(page.meta.last_page, 3);

        let last = QuerySpec { page: 3, ..spec };
        let page = QueryExecutor::execute(&last, &repo).await.unwrap();
        assert_eq!(page.items.len(), 5);
    }

    #[tokio::test]
    async fn empty_store_has_no_pages() {
        let repo = store(0, 0).await;
        let page = QueryExecutor::execute(&QuerySpec::defaults(&config()), &repo).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.meta.total, 0);
        assert_eq!(page.meta.last_page, 0);
    }

    struct Stalled;

    #[async_trait]
    impl Repository<Article> for Stalled {
        async fn count(&self, _: &QuerySpec) -> Result<u64, AppError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(0)
        }
        async fn fetch_page(&self, _: &QuerySpec) -> Result<Vec<Article>, AppError> {
            Ok(Vec::new())
        }
        async fn find_by_id(&self, _: Uuid) -> Result<Option<Article>, AppError> {
            Ok(None)
        }
        async fn save(&self, entity: Article) -> Result<Article, AppError> {
            Ok(entity)
        }
        async fn delete(&self, _: Uuid) -> Result<bool, AppError> {
            Ok(false)
        }
    }

    struct Broken;

    #[async_trait]
    impl Repository<Article> for Broken {
        async fn count(&self, _: &QuerySpec) -> Result<u64, AppError> {
            Err(AppError::Db(sqlx::Error::PoolClosed))
        }
        async fn fetch_page(&self, _: &QuerySpec) -> Result<Vec<Article>, AppError> {
            Ok(Vec::new())
        }
        async fn find_by_id(&self, _: Uuid) -> Result<Option<Article>, AppError> {
            Ok(None)
        }
        async fn save(&self, entity: Article) -> Result<Article, AppError> {
            Ok(entity)
        }
        async fn delete(&self, _: Uuid) -> Result<bool, AppError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn deadline_abandons_store_call() {
        let deadline = Instant::now() + Duration::from_millis(20);
        let err = QueryExecutor::execute_until(&QuerySpec::defaults(&config()), &Stalled, deadline)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn cancellation_abandons_store_call() {
        let token = CancellationToken::new();
        token.cancel();
        let err = QueryExecutor::execute_cancellable(&QuerySpec::defaults(&config()), &Stalled, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let err = QueryExecutor::execute(&QuerySpec::defaults(&config()), &Broken).await.unwrap_err();
        assert!(matches!(err, AppError::Db(sqlx::Error::PoolClosed)));
    }
}
