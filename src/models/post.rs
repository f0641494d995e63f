use crate::config::ResourceQueryConfig;
use crate::repository::Resource;
use crate::service::{FieldRule, FieldRules, Format};
use crate::sql::TableDef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource for Post {
    const NAME: &'static str = "Post";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePost {
    pub title: String,
    pub content: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub content: Option<String>,
}

const TITLE_PATTERN: &str = r"^[a-zA-Z0-9\s\-_.]+$";
const TITLE_MESSAGE: &str = "Title can only contain letters, numbers, spaces, and basic punctuation";

pub fn create_rules() -> &'static FieldRules {
    static RULES: OnceLock<FieldRules> = OnceLock::new();
    RULES.get_or_init(|| {
        FieldRules::new()
            .field("title", FieldRule::required().min_length(3).max_length(100))
            .field("content", FieldRule::required().min_length(10))
    })
}

pub fn update_rules() -> &'static FieldRules {
    static RULES: OnceLock<FieldRules> = OnceLock::new();
    RULES.get_or_init(|| {
        FieldRules::new()
            .field(
                "title",
                FieldRule::optional()
                    .min_length(3)
                    .max_length(100)
                    .pattern(TITLE_PATTERN, TITLE_MESSAGE),
            )
            .field("content", FieldRule::optional().min_length(10))
    })
}

/// `GET /posts?ownerId=` must name a user id.
pub fn owner_filter_rule() -> FieldRule {
    FieldRule::optional().format(Format::Uuid)
}

pub fn query_config() -> ResourceQueryConfig {
    ResourceQueryConfig::new("posts", "createdAt")
        .sortable(&["title", "createdAt", "updatedAt"])
        .searchable(&["title", "content"])
        .filterable(&["ownerId"])
        .max_limit(50)
}

pub fn table(schema: &str) -> TableDef {
    TableDef::new(schema, "posts")
        .column("id", "uuid")
        .column("title", "varchar")
        .column("content", "text")
        .column("ownerId", "uuid")
        .column("createdAt", "timestamptz")
        .column("updatedAt", "timestamptz")
}
