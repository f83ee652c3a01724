//! Help-desk tickets.
//!
//! Permission and transition checks run before any write. Status and
//! urgency/impact/priority are each written by a single UPDATE inside a
//! transaction together with their history rows.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::app::AppState;
use crate::authz::{
    can_access_resolved, filter_by_ownership, require_permission, resolve_role, Actor, Permission,
};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity, log_activity_with_context, RequestContext};
use crate::lifecycle::{available_transitions, calculate_priority, is_privileged, validate_transition, Level, TicketStatus};
use crate::models::ticket::{
    CommentCreateRequest, DbTicket, StatusChange, StatusUpdateRequest, Ticket, TicketAssignRequest, TicketComment,
    TicketCreateRequest, TicketHistoryEntry, TicketUpdateRequest, TransitionsResponse, TICKET_SELECT,
};
use crate::notifications::{dispatch, Notification};
use crate::routes::assets::fetch_asset;
use crate::routes::auth::fetch_user_by_id;
use crate::utils::{require_text, utc_now};

#[derive(Debug, Deserialize)]
pub struct TicketListQuery {
    pub status: Option<String>,
    pub include_archived: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/tickets",
    tag = "Tickets",
    params(
        ("status" = Option<String>, Query, description = "Only tickets in this status"),
        ("include_archived" = Option<bool>, Query, description = "Include archived tickets")
    ),
    responses((status = 200, description = "Tickets visible to the caller", body = [Ticket]))
)]
pub async fn list_tickets(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<TicketListQuery>,
) -> AppResult<Json<Vec<Ticket>>> {
    require_permission(&state.policy, &actor, Permission::TicketsView)?;

    let status = match query.status.as_deref() {
        Some(raw) => Some(parse_status(raw)?),
        None => None,
    };

    let tickets = fetch_tickets(&state.pool, status, query.include_archived.unwrap_or(false)).await?;
    Ok(Json(filter_by_ownership(tickets, &actor.role, actor.id)))
}

#[utoipa::path(
    post,
    path = "/tickets",
    tag = "Tickets",
    request_body = TicketCreateRequest,
    responses((status = 201, description = "Ticket created", body = Ticket))
)]
pub async fn create_ticket(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    Json(payload): Json<TicketCreateRequest>,
) -> AppResult<(StatusCode, Json<Ticket>)> {
    require_permission(&state.policy, &actor, Permission::TicketsCreate)?;

    let title = require_text("title", &payload.title)?;
    let urgency = payload.urgency.unwrap_or_default();
    let impact = payload.impact.unwrap_or_default();
    let priority = calculate_priority(urgency, impact);
    if let Some(asset_id) = payload.asset_id {
        fetch_asset(&state.pool, asset_id).await?;
    }

    let now = utc_now();
    let mut tx = state.pool.begin().await?;
    let id = sqlx::query(
        "INSERT INTO tickets (title, description, category, status, urgency, impact, priority, submitted_by, asset_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&title)
    .bind(payload.description.unwrap_or_default())
    .bind(payload.category.unwrap_or_else(|| "General".to_string()))
    .bind(TicketStatus::Open.as_str())
    .bind(urgency.as_str())
    .bind(impact.as_str())
    .bind(priority.as_str())
    .bind(actor.id)
    .bind(payload.asset_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    record_history(&mut tx, id, actor.id, "status", None, Some(TicketStatus::Open.as_str())).await?;
    tx.commit().await?;

    let ticket = fetch_ticket(&state.pool, id).await?;
    tracing::info!(ticket_id = id, priority = %priority, submitted_by = actor.id, "ticket created");
    log_activity_with_context(
        &state.event_bus,
        "created",
        Some(actor.id),
        &ticket,
        None,
        Some(RequestContext::from_headers(&headers)),
    );
    dispatch(
        state.notifier.as_ref(),
        Notification::TicketCreated {
            ticket_id: id,
            title: ticket.title.clone(),
            priority: priority.to_string(),
        },
    )
    .await;

    Ok((StatusCode::CREATED, Json(ticket)))
}

#[utoipa::path(
    get,
    path = "/tickets/{id}",
    tag = "Tickets",
    params(("id" = i64, Path, description = "Ticket id")),
    responses(
        (status = 200, description = "Ticket detail", body = Ticket),
        (status = 403, description = "Not the caller's ticket")
    )
)]
pub async fn get_ticket(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<Json<Ticket>> {
    require_permission(&state.policy, &actor, Permission::TicketsView)?;
    let ticket = fetch_ticket(&state.pool, id).await?;
    ensure_ticket_visible(&actor, &ticket)?;
    Ok(Json(ticket))
}

#[utoipa::path(
    put,
    path = "/tickets/{id}",
    tag = "Tickets",
    params(("id" = i64, Path, description = "Ticket id")),
    request_body = TicketUpdateRequest,
    responses((status = 200, description = "Ticket updated, priority recomputed", body = Ticket))
)]
pub async fn update_ticket(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(payload): Json<TicketUpdateRequest>,
) -> AppResult<Json<Ticket>> {
    require_permission(&state.policy, &actor, Permission::TicketsUpdate)?;

    let old = fetch_ticket(&state.pool, id).await?;
    ensure_ticket_visible(&actor, &old)?;

    let title = match payload.title {
        Some(title) => require_text("title", &title)?,
        None => old.title.clone(),
    };
    let description = payload.description.unwrap_or_else(|| old.description.clone());
    let category = payload.category.unwrap_or_else(|| old.category.clone());
    let urgency = payload.urgency.unwrap_or(old.urgency);
    let impact = payload.impact.unwrap_or(old.impact);
    let priority = calculate_priority(urgency, impact);

    let mut tx = state.pool.begin().await?;
    sqlx::query(
        "UPDATE tickets SET title = ?, description = ?, category = ?, urgency = ?, impact = ?, priority = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&title)
    .bind(&description)
    .bind(&category)
    .bind(urgency.as_str())
    .bind(impact.as_str())
    .bind(priority.as_str())
    .bind(utc_now())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let changes: [(&str, Level, Level); 3] = [
        ("urgency", old.urgency, urgency),
        ("impact", old.impact, impact),
        ("priority", old.priority, priority),
    ];
    for (field, before, after) in changes {
        if before != after {
            record_history(&mut tx, id, actor.id, field, Some(before.as_str()), Some(after.as_str())).await?;
        }
    }
    tx.commit().await?;

    let ticket = fetch_ticket(&state.pool, id).await?;
    log_activity_with_context(
        &state.event_bus,
        "updated",
        Some(actor.id),
        &ticket,
        Some(&old),
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Json(ticket))
}

#[utoipa::path(
    put,
    path = "/tickets/{id}/status",
    tag = "Tickets",
    params(("id" = i64, Path, description = "Ticket id")),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Status changed", body = Ticket),
        (status = 409, description = "Ticket changed concurrently"),
        (status = 422, description = "Transition not allowed for the caller")
    )
)]
pub async fn update_status(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(payload): Json<StatusUpdateRequest>,
) -> AppResult<Json<Ticket>> {
    require_permission(&state.policy, &actor, Permission::TicketsView)?;

    let old = fetch_ticket(&state.pool, id).await?;
    ensure_ticket_visible(&actor, &old)?;

    let target = parse_status(&payload.status)?;
    validate_transition(&old.status, target, &actor.role)?;

    apply_status(&state.pool, &old, target, actor.id).await?;

    let change = StatusChange {
        ticket_id: id,
        from: old.status.clone(),
        to: target.as_str().to_string(),
    };
    tracing::info!(ticket_id = id, from = %change.from, to = %change.to, actor_id = actor.id, "ticket status changed");
    log_activity_with_context(
        &state.event_bus,
        "updated",
        Some(actor.id),
        &change,
        None,
        Some(RequestContext::from_headers(&headers)),
    );
    dispatch(
        state.notifier.as_ref(),
        Notification::TicketStatusChanged {
            ticket_id: id,
            from: change.from,
            to: change.to,
            recipient_id: old.submitted_by,
        },
    )
    .await;

    Ok(Json(fetch_ticket(&state.pool, id).await?))
}

/// Compare-and-set on the status column. Losing a race surfaces as a conflict.
/// Any status other than Closed brings an archived ticket back.
async fn apply_status(pool: &SqlitePool, old: &Ticket, target: TicketStatus, actor_id: i64) -> AppResult<()> {
    let now = utc_now();
    let unarchive = target != TicketStatus::Closed && old.archived_at.is_some();
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        "UPDATE tickets SET status = ?, archived_at = CASE WHEN ? THEN NULL ELSE archived_at END, updated_at = ? \
         WHERE id = ? AND status = ?",
    )
    .bind(target.as_str())
    .bind(unarchive)
    .bind(now)
    .bind(old.id)
    .bind(&old.status)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(AppError::conflict("ticket status changed by another request, reload and retry"));
    }

    record_history(&mut tx, old.id, actor_id, "status", Some(&old.status), Some(target.as_str())).await?;
    if let (true, Some(archived_at)) = (unarchive, old.archived_at) {
        record_history(&mut tx, old.id, actor_id, "archived_at", Some(&archived_at.to_rfc3339()), None).await?;
    }
    tx.commit().await?;
    Ok(())
}

#[utoipa::path(
    get,
    path = "/tickets/{id}/transitions",
    tag = "Tickets",
    params(("id" = i64, Path, description = "Ticket id")),
    responses((status = 200, description = "Statuses the caller may move the ticket to", body = TransitionsResponse))
)]
pub async fn list_transitions(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<Json<TransitionsResponse>> {
    require_permission(&state.policy, &actor, Permission::TicketsView)?;
    let ticket = fetch_ticket(&state.pool, id).await?;
    ensure_ticket_visible(&actor, &ticket)?;

    let available = available_transitions(&ticket.status, &actor.role).statuses();
    Ok(Json(TransitionsResponse {
        current: ticket.status,
        available,
    }))
}

#[utoipa::path(
    put,
    path = "/tickets/{id}/assign",
    tag = "Tickets",
    params(("id" = i64, Path, description = "Ticket id")),
    request_body = TicketAssignRequest,
    responses((status = 200, description = "Ticket assigned", body = Ticket))
)]
pub async fn assign_ticket(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(payload): Json<TicketAssignRequest>,
) -> AppResult<Json<Ticket>> {
    require_permission(&state.policy, &actor, Permission::TicketsAssign)?;
    let old = fetch_ticket(&state.pool, id).await?;

    if let Some(assignee_id) = payload.assignee_id {
        let assignee = fetch_user_by_id(&state.pool, assignee_id).await?;
        if !is_privileged(&resolve_role(&assignee.role)) {
            return Err(AppError::bad_request("tickets can only be assigned to agents or above"));
        }
    }

    let mut tx = state.pool.begin().await?;
    sqlx::query("UPDATE tickets SET assigned_to = ?, updated_at = ? WHERE id = ?")
        .bind(payload.assignee_id)
        .bind(utc_now())
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let before = old.assigned_to.map(|v| v.to_string());
    let after = payload.assignee_id.map(|v| v.to_string());
    record_history(&mut tx, id, actor.id, "assigned_to", before.as_deref(), after.as_deref()).await?;
    tx.commit().await?;

    let ticket = fetch_ticket(&state.pool, id).await?;
    log_activity_with_context(&state.event_bus, "assigned", Some(actor.id), &ticket, Some(&old), None);
    if let Some(assignee_id) = payload.assignee_id {
        dispatch(state.notifier.as_ref(), Notification::TicketAssigned { ticket_id: id, assignee_id }).await;
    }

    Ok(Json(ticket))
}

#[utoipa::path(
    delete,
    path = "/tickets/{id}",
    tag = "Tickets",
    params(("id" = i64, Path, description = "Ticket id")),
    responses((status = 204, description = "Ticket closed and archived"))
)]
pub async fn archive_ticket(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    require_permission(&state.policy, &actor, Permission::TicketsDelete)?;
    let ticket = fetch_ticket(&state.pool, id).await?;
    if ticket.archived_at.is_some() {
        return Ok(StatusCode::NO_CONTENT);
    }

    let now = utc_now();
    let mut tx = state.pool.begin().await?;
    sqlx::query("UPDATE tickets SET status = ?, archived_at = ?, updated_at = ? WHERE id = ?")
        .bind(TicketStatus::Closed.as_str())
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    if ticket.status != TicketStatus::Closed.as_str() {
        record_history(&mut tx, id, actor.id, "status", Some(&ticket.status), Some(TicketStatus::Closed.as_str())).await?;
    }
    tx.commit().await?;

    log_activity(&state.event_bus, "archived", Some(actor.id), &ticket);
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/tickets/{id}/history",
    tag = "Tickets",
    params(("id" = i64, Path, description = "Ticket id")),
    responses((status = 200, description = "Field change history", body = [TicketHistoryEntry]))
)]
pub async fn list_history(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<TicketHistoryEntry>>> {
    require_permission(&state.policy, &actor, Permission::TicketsView)?;
    let ticket = fetch_ticket(&state.pool, id).await?;
    ensure_ticket_visible(&actor, &ticket)?;

    let entries = sqlx::query_as::<_, TicketHistoryEntry>(
        "SELECT id, ticket_id, changed_by, field, old_value, new_value, changed_at FROM ticket_history WHERE ticket_id = ? ORDER BY id",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(entries))
}

#[utoipa::path(
    get,
    path = "/tickets/{id}/comments",
    tag = "Tickets",
    params(("id" = i64, Path, description = "Ticket id")),
    responses((status = 200, description = "Ticket comments", body = [TicketComment]))
)]
pub async fn list_comments(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<TicketComment>>> {
    require_permission(&state.policy, &actor, Permission::TicketsView)?;
    let ticket = fetch_ticket(&state.pool, id).await?;
    ensure_ticket_visible(&actor, &ticket)?;

    let comments = sqlx::query_as::<_, TicketComment>(
        "SELECT id, ticket_id, author_id, body, created_at FROM ticket_comments WHERE ticket_id = ? ORDER BY id",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(comments))
}

#[utoipa::path(
    post,
    path = "/tickets/{id}/comments",
    tag = "Tickets",
    params(("id" = i64, Path, description = "Ticket id")),
    request_body = CommentCreateRequest,
    responses((status = 201, description = "Comment added", body = TicketComment))
)]
pub async fn add_comment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(payload): Json<CommentCreateRequest>,
) -> AppResult<(StatusCode, Json<TicketComment>)> {
    require_permission(&state.policy, &actor, Permission::TicketsComment)?;
    let ticket = fetch_ticket(&state.pool, id).await?;
    ensure_ticket_visible(&actor, &ticket)?;

    let body = require_text("body", &payload.body)?;
    let comment_id = sqlx::query("INSERT INTO ticket_comments (ticket_id, author_id, body, created_at) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(actor.id)
        .bind(&body)
        .bind(utc_now())
        .execute(&state.pool)
        .await?
        .last_insert_rowid();

    let comment = sqlx::query_as::<_, TicketComment>(
        "SELECT id, ticket_id, author_id, body, created_at FROM ticket_comments WHERE id = ?",
    )
    .bind(comment_id)
    .fetch_one(&state.pool)
    .await?;

    log_activity(&state.event_bus, "created", Some(actor.id), &comment);
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Privileged roles see every ticket; others need ownership, assignment or
/// to manage the submitter.
pub fn ensure_ticket_visible(actor: &Actor, ticket: &Ticket) -> AppResult<()> {
    let visible = is_privileged(&actor.role)
        || can_access_resolved(&actor.role, actor.id, Some(ticket.submitted_by), ticket.submitter_manager_id)
        || ticket.assigned_to == Some(actor.id);

    if visible {
        Ok(())
    } else {
        Err(AppError::forbidden("ownership of this ticket", actor.role.label()))
    }
}

fn parse_status(raw: &str) -> AppResult<TicketStatus> {
    raw.parse::<TicketStatus>().map_err(AppError::bad_request)
}

async fn record_history(
    tx: &mut Transaction<'_, Sqlite>,
    ticket_id: i64,
    changed_by: i64,
    field: &str,
    old_value: Option<&str>,
    new_value: Option<&str>,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO ticket_history (ticket_id, changed_by, field, old_value, new_value, changed_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(ticket_id)
    .bind(changed_by)
    .bind(field)
    .bind(old_value)
    .bind(new_value)
    .bind(utc_now())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn fetch_ticket(pool: &SqlitePool, id: i64) -> AppResult<Ticket> {
    let sql = format!("{TICKET_SELECT} WHERE t.id = ?");
    sqlx::query_as::<_, DbTicket>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("ticket not found"))?
        .try_into()
}

pub async fn fetch_tickets(pool: &SqlitePool, status: Option<TicketStatus>, include_archived: bool) -> AppResult<Vec<Ticket>> {
    let mut sql = format!("{TICKET_SELECT} WHERE 1 = 1");
    if !include_archived {
        sql.push_str(" AND t.archived_at IS NULL");
    }
    if status.is_some() {
        sql.push_str(" AND t.status = ?");
    }
    sql.push_str(" ORDER BY t.created_at DESC, t.id DESC");

    let mut query = sqlx::query_as::<_, DbTicket>(&sql);
    if let Some(status) = status {
        query = query.bind(status.as_str());
    }

    query
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(Ticket::try_from)
        .collect()
}
