//! Employee self-service: the caller's own hardware and tickets, regardless of role.

use axum::extract::State;
use axum::Json;

use crate::app::AppState;
use crate::authz::{can_access_resolved, require_permission, Actor, OwnedResource, Permission};
use crate::errors::AppResult;
use crate::models::asset::{Asset, ASSET_COLUMNS};
use crate::models::ticket::Ticket;
use crate::routes::tickets::fetch_tickets;

#[utoipa::path(
    get,
    path = "/portal/assets",
    tag = "Portal",
    responses((status = 200, description = "Assets issued to the caller", body = [Asset]))
)]
pub async fn my_assets(State(state): State<AppState>, actor: Actor) -> AppResult<Json<Vec<Asset>>> {
    require_permission(&state.policy, &actor, Permission::AssetsView)?;

    let Some(employee_id) = actor.employee_id else {
        return Ok(Json(Vec::new()));
    };

    let sql = format!("SELECT {ASSET_COLUMNS} FROM assets WHERE assigned_to = ? AND deleted_at IS NULL ORDER BY asset_tag");
    let assets = sqlx::query_as::<_, Asset>(&sql)
        .bind(employee_id)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(assets))
}

#[utoipa::path(
    get,
    path = "/portal/tickets",
    tag = "Portal",
    responses((status = 200, description = "Tickets the caller submitted or is assigned, plus direct reports for managers", body = [Ticket]))
)]
pub async fn my_tickets(State(state): State<AppState>, actor: Actor) -> AppResult<Json<Vec<Ticket>>> {
    require_permission(&state.policy, &actor, Permission::TicketsView)?;

    let tickets = fetch_tickets(&state.pool, None, true)
        .await?
        .into_iter()
        .filter(|ticket| is_on_my_desk(&actor, ticket))
        .collect();

    Ok(Json(tickets))
}

/// Submitted by or assigned to the caller. Managers also get their direct
/// reports' tickets; administrators' blanket access does not apply here.
fn is_on_my_desk(actor: &Actor, ticket: &Ticket) -> bool {
    if ticket.submitter_id() == Some(actor.id) || ticket.assignee_id() == Some(actor.id) {
        return true;
    }
    !actor.role.effective().is_administrative()
        && can_access_resolved(&actor.role, actor.id, ticket.submitter_id(), ticket.submitter_manager_id)
}
