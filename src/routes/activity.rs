use axum::extract::{Query, State};
use axum::Json;

use crate::app::AppState;
use crate::authz::{require_permission, Actor, Permission};
use crate::errors::{AppError, AppResult};
use crate::events::Severity;
use crate::models::activity::{ActivityEntry, ActivityQuery};

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

#[utoipa::path(
    get,
    path = "/activity",
    tag = "Activity",
    params(
        ("limit" = Option<i64>, Query, description = "Maximum rows, newest first"),
        ("severity" = Option<String>, Query, description = "critical, important or noise")
    ),
    responses((status = 200, description = "Audit trail", body = [ActivityEntry]))
)]
pub async fn list_activity(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<ActivityQuery>,
) -> AppResult<Json<Vec<ActivityEntry>>> {
    require_permission(&state.policy, &actor, Permission::AuditView)?;

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let severity = match query.severity.as_deref() {
        None => None,
        Some(raw) => Some(
            [Severity::Critical, Severity::Important, Severity::Noise]
                .into_iter()
                .find(|s| s.as_str().eq_ignore_ascii_case(raw))
                .ok_or_else(|| AppError::bad_request(format!("unknown severity {raw}")))?,
        ),
    };

    let entries = match severity {
        Some(severity) => {
            sqlx::query_as::<_, ActivityEntry>(
                "SELECT id, event_name, description, actor_id, subject_id, occurred_at, severity FROM activity_log \
                 WHERE severity = ? ORDER BY occurred_at DESC LIMIT ?",
            )
            .bind(severity.as_str())
            .bind(limit)
            .fetch_all(&state.pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, ActivityEntry>(
                "SELECT id, event_name, description, actor_id, subject_id, occurred_at, severity FROM activity_log \
                 ORDER BY occurred_at DESC LIMIT ?",
            )
            .bind(limit)
            .fetch_all(&state.pool)
            .await?
        }
    };

    Ok(Json(entries))
}
