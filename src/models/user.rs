use crate::config::ResourceQueryConfig;
use crate::guard::Role;
use crate::repository::Resource;
use crate::service::{FieldRule, FieldRules, Format};
use crate::sql::TableDef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub role: Role,
    pub is_active: bool,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource for User {
    const NAME: &'static str = "User";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// What clients see of a user. Never carries the password hash.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        UserView {
            id: u.id,
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            phone_number: u.phone_number,
            role: u.role,
            is_active: u.is_active,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub password: String,
}

pub fn create_rules() -> &'static FieldRules {
    static RULES: OnceLock<FieldRules> = OnceLock::new();
    RULES.get_or_init(|| {
        FieldRules::new()
            .field("firstName", FieldRule::required().max_length(100))
            .field("lastName", FieldRule::required().max_length(100))
            .field("email", FieldRule::required().max_length(255).format(Format::Email))
            .field("phoneNumber", FieldRule::required().max_length(20).format(Format::Phone))
            .field("password", FieldRule::required().min_length(8).max_length(128))
    })
}

pub fn query_config() -> ResourceQueryConfig {
    ResourceQueryConfig::new("users", "createdAt")
        .sortable(&["firstName", "lastName", "email", "createdAt"])
        .searchable(&["firstName", "lastName", "email"])
        .filterable(&["phoneNumber"])
        .max_limit(100)
}

pub fn table(schema: &str) -> TableDef {
    TableDef::new(schema, "users")
        .column("id", "uuid")
        .column("firstName", "varchar")
        .column("lastName", "varchar")
        .column("email", "varchar")
        .column("phoneNumber", "varchar")
        .column("role", "varchar")
        .column("isActive", "boolean")
        .column("passwordHash", "varchar")
        .column("createdAt", "timestamptz")
        .column("updatedAt", "timestamptz")
}

/// Fields the store keeps unique.
pub const UNIQUE_FIELDS: &[&str] = &["email", "phoneNumber"];
