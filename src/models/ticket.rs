use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::authz::OwnedResource;
use crate::errors::AppError;
use crate::events::{Loggable, Severity};
use crate::lifecycle::Level;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Ticket {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[schema(example = "Hardware")]
    pub category: String,
    #[schema(example = "Open")]
    pub status: String,
    pub urgency: Level,
    pub impact: Level,
    /// Always derived from urgency and impact.
    pub priority: Level,
    pub submitted_by: i64,
    pub assigned_to: Option<i64>,
    pub asset_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
    /// Manager of the submitter, used for hierarchical access.
    #[serde(skip)]
    pub submitter_manager_id: Option<i64>,
}

impl Loggable for Ticket {
    fn entity_type() -> &'static str { "ticket" }
    fn subject_id(&self) -> i64 { self.id }
}

impl OwnedResource for Ticket {
    fn submitter_id(&self) -> Option<i64> {
        Some(self.submitted_by)
    }

    fn assignee_id(&self) -> Option<i64> {
        self.assigned_to
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbTicket {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: String,
    pub urgency: String,
    pub impact: String,
    pub priority: String,
    pub submitted_by: i64,
    pub assigned_to: Option<i64>,
    pub asset_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
    pub submitter_manager_id: Option<i64>,
}

fn parse_level(column: &str, raw: &str) -> Result<Level, AppError> {
    raw.parse::<Level>()
        .map_err(|err| AppError::internal(format!("ticket {column}: {err}")))
}

impl TryFrom<DbTicket> for Ticket {
    type Error = AppError;

    fn try_from(value: DbTicket) -> Result<Self, Self::Error> {
        Ok(Ticket {
            id: value.id,
            title: value.title,
            description: value.description,
            category: value.category,
            status: value.status,
            urgency: parse_level("urgency", &value.urgency)?,
            impact: parse_level("impact", &value.impact)?,
            priority: parse_level("priority", &value.priority)?,
            submitted_by: value.submitted_by,
            assigned_to: value.assigned_to,
            asset_id: value.asset_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
            archived_at: value.archived_at,
            submitter_manager_id: value.submitter_manager_id,
        })
    }
}

/// Ticket columns joined with the submitter's manager.
pub const TICKET_SELECT: &str = "SELECT t.id, t.title, t.description, t.category, t.status, t.urgency, t.impact, t.priority, \
     t.submitted_by, t.assigned_to, t.asset_id, t.created_at, t.updated_at, t.archived_at, \
     u.manager_id AS submitter_manager_id \
     FROM tickets t JOIN users u ON u.id = t.submitted_by";

#[derive(Debug, Deserialize, ToSchema)]
pub struct TicketCreateRequest {
    #[schema(example = "Laptop will not boot")]
    pub title: String,
    #[schema(example = "Black screen after the latest update")]
    pub description: Option<String>,
    #[schema(example = "Hardware")]
    pub category: Option<String>,
    pub urgency: Option<Level>,
    pub impact: Option<Level>,
    pub asset_id: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TicketUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub urgency: Option<Level>,
    pub impact: Option<Level>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusUpdateRequest {
    #[schema(example = "In Progress")]
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TicketAssignRequest {
    /// `null` unassigns the ticket.
    pub assignee_id: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransitionsResponse {
    pub current: String,
    pub available: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema, FromRow)]
pub struct TicketHistoryEntry {
    pub id: i64,
    pub ticket_id: i64,
    pub changed_by: i64,
    #[schema(example = "status")]
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// Status change as sent to the audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub ticket_id: i64,
    pub from: String,
    pub to: String,
}

impl Loggable for StatusChange {
    fn entity_type() -> &'static str { "ticket_status" }
    fn subject_id(&self) -> i64 { self.ticket_id }
    fn severity(&self) -> Severity { Severity::Important }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct TicketComment {
    pub id: i64,
    pub ticket_id: i64,
    pub author_id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Loggable for TicketComment {
    fn entity_type() -> &'static str { "ticket_comment" }
    fn subject_id(&self) -> i64 { self.ticket_id }
    fn severity(&self) -> Severity { Severity::Noise }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentCreateRequest {
    #[schema(example = "Rebooted twice, same result")]
    pub body: String,
}
