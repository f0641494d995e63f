use super::{decode, into_object, run_query};
use crate::config::ResourceQueryConfig;
use crate::error::AppError;
use crate::guard::Role;
use crate::models::user::{self, CreateUser, User, UserView};
use crate::query::{PaginatedResult, QuerySpec};
use crate::repository::{Repository, Resource};
use crate::service::{normalize_field, normalize_phone, Hasher, PhoneValidator, RequestValidator};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Phone number as it arrives in a query string: form decoding turns a
/// leading '+' into a space, and punctuation is dropped as on create.
fn phone_from_query(raw: &str) -> String {
    match raw.strip_prefix(' ') {
        Some(rest) => normalize_phone(&format!("+{}", rest)),
        None => normalize_phone(raw),
    }
}

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn Repository<User>>,
    hasher: Arc<dyn Hasher>,
    validator: RequestValidator,
    query: ResourceQueryConfig,
    store_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl UserService {
    pub fn new(repo: Arc<dyn Repository<User>>, hasher: Arc<dyn Hasher>, phone: Arc<dyn PhoneValidator>) -> Self {
        UserService {
            repo,
            hasher,
            validator: RequestValidator::new(phone),
            query: user::query_config(),
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

    pub async fn create(&self, body: Value) -> Result<UserView, AppError> {
        let mut body = into_object(body)?;
        normalize_field(&mut body, "phoneNumber", normalize_phone);
        normalize_field(&mut body, "email", |s| s.trim().to_string());
        self.validator.validate(&body, user::create_rules())?;
        let input: CreateUser = decode(body)?;

        let hasher = Arc::clone(&self.hasher);
        let password = input.password;
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {}", e)))??;

        let now = Utc::now();
        let saved = self
            .repo
            .save(User {
                id: Uuid::new_v4(),
                first_name: input.first_name,
                last_name: input.last_name,
                email: input.email,
                phone_number: input.phone_number,
                role: Role::User,
                is_active: true,
                password_hash,
                created_at: now,
                updated_at: now,
            })
            .await?;
        tracing::info!(user_id = %saved.id, "user created");
        Ok(saved.into())
    }

    pub async fn list(&self, params: &HashMap<String, String>) -> Result<PaginatedResult<UserView>, AppError> {
        let spec = match params.get("phoneNumber") {
            Some(raw) => {
                let mut params = params.clone();
                params.insert("phoneNumber".to_string(), phone_from_query(raw));
                QuerySpec::from_params(&params, &self.query)?
            }
            None => QuerySpec::from_params(params, &self.query)?,
        };
        let page = run_query(&spec, self.repo.as_ref(), self.store_timeout, &self.cancel).await?;
        Ok(page.map(UserView::from))
    }

    pub async fn find_by_phone(&self, raw: &str) -> Result<UserView, AppError> {
        let phone = phone_from_query(raw);
        if phone.is_empty() {
            return Err(AppError::invalid_field("phoneNumber", "phoneNumber should not be empty"));
        }
        let spec = QuerySpec::defaults(&self.query)
            .with_filter("phoneNumber", &phone)
            .with_limit(1);
        let found = self.repo.fetch_page(&spec).await?.into_iter().next();
        found
            .map(UserView::from)
            .ok_or_else(|| AppError::NotFound(format!("User with phone number {} not found", phone)))
    }

    pub async fn get(&self, id: Uuid) -> Result<UserView, AppError> {
        self.repo
            .find_by_id(id)
            .await?
            .map(UserView::from)
            .ok_or_else(|| AppError::not_found(User::NAME, id))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if !self.repo.delete(id).await? {
            return Err(AppError::not_found(User::NAME, id));
        }
        tracing::info!(user_id = %id, "user deleted");
        Ok(())
    }
}
