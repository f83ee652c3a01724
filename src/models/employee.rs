use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::events::Loggable;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub manager_id: Option<i64>,
    #[schema(example = "Active")]
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loggable for Employee {
    fn entity_type() -> &'static str { "employee" }
    fn subject_id(&self) -> i64 { self.id }
}

pub const EMPLOYEE_COLUMNS: &str =
    "id, name, email, department, position, manager_id, status, created_at, updated_at";

#[derive(Debug, Deserialize, ToSchema)]
pub struct EmployeeCreateRequest {
    #[schema(example = "Alan Turing")]
    pub name: String,
    #[schema(example = "alan@example.com")]
    pub email: String,
    #[schema(example = "Engineering")]
    pub department: Option<String>,
    #[schema(example = "Developer")]
    pub position: Option<String>,
    pub manager_id: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EmployeeUpdateRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub manager_id: Option<i64>,
    #[schema(example = "Inactive")]
    pub status: Option<String>,
}
