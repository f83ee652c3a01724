//! Admin console: user listing and role assignment.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::app::AppState;
use crate::authz::{require_permission, require_role_level, resolve_role, Actor, Permission, ResolvedRole};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity_with_context, RequestContext};
use crate::models::user::{DbUser, RoleChange, RoleUpdateRequest, User, USER_COLUMNS};
use crate::routes::auth::fetch_user_by_id;
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    responses((status = 200, description = "All users", body = [User]))
)]
pub async fn list_users(State(state): State<AppState>, actor: Actor) -> AppResult<Json<Vec<User>>> {
    require_permission(&state.policy, &actor, Permission::UsersView)?;

    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL ORDER BY name");
    let users = sqlx::query_as::<_, DbUser>(&sql)
        .fetch_all(&state.pool)
        .await?
        .into_iter()
        .map(User::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(users))
}

#[utoipa::path(
    put,
    path = "/users/{id}/role",
    tag = "Users",
    params(("id" = i64, Path, description = "User id")),
    request_body = RoleUpdateRequest,
    responses(
        (status = 200, description = "Role updated", body = User),
        (status = 403, description = "Caller below admin or granting above own level")
    )
)]
pub async fn update_role(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(payload): Json<RoleUpdateRequest>,
) -> AppResult<Json<User>> {
    require_role_level(&actor, "admin")?;
    require_permission(&state.policy, &actor, Permission::UsersManage)?;

    let new_role = match resolve_role(&payload.role) {
        ResolvedRole::Known(role) => role,
        ResolvedRole::Unrecognized(raw) => return Err(AppError::bad_request(format!("unknown role {raw}"))),
    };
    if new_role.level() > actor.role.level() {
        return Err(AppError::forbidden(format!("role {new_role} or higher"), actor.role.label()));
    }
    if payload.manager_id == Some(id) {
        return Err(AppError::bad_request("a user cannot manage themselves"));
    }

    let existing = fetch_user_by_id(&state.pool, id).await?;
    if resolve_role(&existing.role).level() > actor.role.level() {
        return Err(AppError::forbidden("a higher role than the target's", actor.role.label()));
    }

    sqlx::query(
        "UPDATE users SET role = ?, manager_id = COALESCE(?, manager_id), employee_id = COALESCE(?, employee_id), updated_at = ? WHERE id = ?",
    )
    .bind(new_role.as_str())
    .bind(payload.manager_id)
    .bind(payload.employee_id)
    .bind(utc_now())
    .bind(id)
    .execute(&state.pool)
    .await?;

    let change = RoleChange {
        user_id: id,
        old_role: existing.role,
        new_role: new_role.as_str().to_string(),
    };
    tracing::info!(user_id = id, from = %change.old_role, to = %change.new_role, changed_by = actor.id, "role changed");
    log_activity_with_context(
        &state.event_bus,
        "updated",
        Some(actor.id),
        &change,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    let user: User = fetch_user_by_id(&state.pool, id).await?.try_into()?;
    Ok(Json(user))
}
