use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::events::{Loggable, Severity};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// Stored verbatim; normalized when an actor is built.
    #[schema(example = "agent")]
    pub role: String,
    pub employee_id: Option<i64>,
    pub manager_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loggable for User {
    fn entity_type() -> &'static str { "user" }
    fn subject_id(&self) -> i64 { self.id }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub employee_id: Option<i64>,
    pub manager_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<DbUser> for User {
    type Error = AppError;

    fn try_from(value: DbUser) -> Result<Self, Self::Error> {
        Ok(User {
            id: value.id,
            name: value.name,
            email: value.email,
            role: value.role,
            employee_id: value.employee_id,
            manager_id: value.manager_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

pub const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, employee_id, manager_id, created_at, updated_at, deleted_at";

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "Grace Hopper")]
    pub name: String,
    #[schema(example = "grace@example.com")]
    pub email: String,
    #[schema(example = "S3cureP@ssw0rd")]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "grace@example.com")]
    pub email: String,
    #[schema(example = "S3cureP@ssw0rd")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub user: User,
    /// Normalized role the permissions were evaluated for.
    pub effective_role: String,
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleUpdateRequest {
    #[schema(example = "manager")]
    pub role: String,
    pub manager_id: Option<i64>,
    pub employee_id: Option<i64>,
}

/// Role changes are always retained in the audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct RoleChange {
    pub user_id: i64,
    pub old_role: String,
    pub new_role: String,
}

impl Loggable for RoleChange {
    fn entity_type() -> &'static str { "user_role" }
    fn subject_id(&self) -> i64 { self.user_id }
    fn severity(&self) -> Severity { Severity::Critical }
}
