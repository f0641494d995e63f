//! Shared application state for all routes.

use crate::config::Settings;
use crate::service::{PostService, UserService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub posts: PostService,
    pub settings: Arc<Settings>,
}
