use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema, FromRow)]
pub struct ActivityEntry {
    pub id: String,
    #[schema(example = "ticket_status.updated")]
    pub event_name: String,
    pub description: String,
    pub actor_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub occurred_at: DateTime<Utc>,
    #[schema(example = "important")]
    pub severity: String,
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
    pub severity: Option<String>,
}
