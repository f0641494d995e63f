use super::{decode, into_object, run_query};
use crate::config::ResourceQueryConfig;
use crate::error::AppError;
use crate::guard::Principal;
use crate::models::post::{self, CreatePost, Post, UpdatePost};
use crate::query::{PaginatedResult, QuerySpec};
use crate::repository::{Repository, Resource};
use crate::service::{normalize_field, PhoneValidator, RequestValidator};
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Clone)]
pub struct PostService {
    repo: Arc<dyn Repository<Post>>,
    validator: RequestValidator,
    query: ResourceQueryConfig,
    store_timeout: Option<Duration>,
    cancel: CancellationToken,
}

fn trim_text(body: &mut Map<String, Value>) {
    for field in ["title", "content"] {
        normalize_field(body, field, |s| s.trim().to_string());
    }
}

/// Only the author may change or remove a post.
fn ensure_owner(principal: &Principal, post: &Post) -> Result<(), AppError> {
    if post.owner_id == principal.id {
        Ok(())
    } else {
        Err(AppError::Forbidden("You can only modify your own posts".into()))
    }
}

impl PostService {
    pub fn new(repo: Arc<dyn Repository<Post>>, phone: Arc<dyn PhoneValidator>) -> Self {
        PostService {
            repo,
            validator: RequestValidator::new(phone),
            query: post::query_config(),
            store_timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_query_config(mut self, query: ResourceQueryConfig) -> Self {
        self.query = query;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// In-flight list queries answer 503 once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn query_config(&self) -> &ResourceQueryConfig {
        &self.query
    }

    pub async fn create(&self, principal: &Principal, body: Value) -> Result<Post, AppError> {
        let mut body = into_object(body)?;
        trim_text(&mut body);
        self.validator.validate(&body, post::create_rules())?;
        let input: CreatePost = decode(body)?;
        let now = Utc::now();
        let saved = self
            .repo
            .save(Post {
                id: Uuid::new_v4(),
                title: input.title,
                content: input.content,
                owner_id: principal.id,
                created_at: now,
                updated_at: now,
            })
            .await?;
        tracing::info!(post_id = %saved.id, owner_id = %saved.owner_id, "post created");
        Ok(saved)
    }

    pub async fn list(&self, params: &HashMap<String, String>) -> Result<PaginatedResult<Post>, AppError> {
        if let Some(owner) = params.get("ownerId").map(|v| v.trim()).filter(|v| !v.is_empty()) {
            self.validator.validate_value("ownerId", owner, &post::owner_filter_rule())?;
        }
        let spec = QuerySpec::from_params(params, &self.query)?;
        run_query(&spec, self.repo.as_ref(), self.store_timeout, &self.cancel).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Post, AppError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(Post::NAME, id))
    }

    pub async fn update(&self, principal: &Principal, id: Uuid, body: Value) -> Result<Post, AppError> {
        let mut existing = self.get(id).await?;
        ensure_owner(principal, &existing)?;

        let mut body = into_object(body)?;
        trim_text(&mut body);
        self.validator.validate_partial(&body, post::update_rules())?;
        let changes: UpdatePost = decode(body)?;
        if let Some(title) = changes.title {
            existing.title = title;
        }
        if let Some(content) = changes.content {
            existing.content = content;
        }
        existing.updated_at = Utc::now();
        let saved = self.repo.save(existing).await?;
        tracing::info!(post_id = %saved.id, "post updated");
        Ok(saved)
    }

    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), AppError> {
        let existing = self.get(id).await?;
        ensure_owner(principal, &existing)?;
        if !self.repo.delete(id).await? {
            return Err(AppError::not_found(Post::NAME, id));
        }
        tracing::info!(post_id = %id, "post deleted");
        Ok(())
    }
}
