use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::authz::OwnedResource;
use crate::errors::AppError;
use crate::events::Loggable;

pub const ASSET_STATUSES: [&str; 4] = ["Available", "In Use", "Maintenance", "Retired"];

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Asset {
    pub id: i64,
    #[schema(example = "LT-0042")]
    pub asset_tag: String,
    pub name: String,
    #[schema(example = "Laptop")]
    pub category: String,
    #[schema(example = "In Use")]
    pub status: String,
    pub serial_number: Option<String>,
    /// Employee record the asset is issued to.
    pub assigned_to: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loggable for Asset {
    fn entity_type() -> &'static str { "asset" }
    fn subject_id(&self) -> i64 { self.id }
}

/// Assets are owned through the employee record they are assigned to.
impl OwnedResource for Asset {
    fn submitter_id(&self) -> Option<i64> {
        None
    }

    fn assignee_id(&self) -> Option<i64> {
        self.assigned_to
    }
}

pub const ASSET_COLUMNS: &str =
    "id, asset_tag, name, category, status, serial_number, assigned_to, notes, created_at, updated_at";

pub fn validate_asset_status(status: &str) -> Result<String, AppError> {
    ASSET_STATUSES
        .iter()
        .find(|known| known.eq_ignore_ascii_case(status.trim()))
        .map(|known| known.to_string())
        .ok_or_else(|| AppError::bad_request(format!("unknown asset status {status}")))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssetCreateRequest {
    #[schema(example = "LT-0042")]
    pub asset_tag: String,
    #[schema(example = "ThinkPad X1")]
    pub name: String,
    #[schema(example = "Laptop")]
    pub category: String,
    pub serial_number: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssetUpdateRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub serial_number: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssetAssignRequest {
    /// `null` returns the asset to the pool.
    pub employee_id: Option<i64>,
}
