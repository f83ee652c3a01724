use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use sqlx::SqlitePool;

use crate::app::AppState;
use crate::authz::{can_access_resolved, filter_by_ownership, require_permission, Actor, Permission, Role};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity, log_activity_with_context, RequestContext};
use crate::models::asset::{
    validate_asset_status, Asset, AssetAssignRequest, AssetCreateRequest, AssetUpdateRequest, ASSET_COLUMNS,
};
use crate::routes::employees::fetch_employee;
use crate::utils::{require_text, utc_now};

#[utoipa::path(
    get,
    path = "/assets",
    tag = "Assets",
    responses((status = 200, description = "Assets visible to the caller", body = [Asset]))
)]
pub async fn list_assets(State(state): State<AppState>, actor: Actor) -> AppResult<Json<Vec<Asset>>> {
    require_permission(&state.policy, &actor, Permission::AssetsView)?;

    let sql = format!("SELECT {ASSET_COLUMNS} FROM assets WHERE deleted_at IS NULL ORDER BY asset_tag");
    let assets = sqlx::query_as::<_, Asset>(&sql).fetch_all(&state.pool).await?;
    Ok(Json(visible_assets(assets, &actor)))
}

/// Employees only see hardware issued to their own employee record.
pub fn visible_assets(assets: Vec<Asset>, actor: &Actor) -> Vec<Asset> {
    match actor.employee_id {
        Some(employee_id) => filter_by_ownership(assets, &actor.role, employee_id),
        None if actor.role.effective() == Role::Employee => Vec::new(),
        None => assets,
    }
}

#[utoipa::path(
    post,
    path = "/assets",
    tag = "Assets",
    request_body = AssetCreateRequest,
    responses((status = 201, description = "Asset created", body = Asset))
)]
pub async fn create_asset(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<AssetCreateRequest>,
) -> AppResult<(StatusCode, Json<Asset>)> {
    require_permission(&state.policy, &actor, Permission::AssetsCreate)?;

    let asset_tag = require_text("asset_tag", &payload.asset_tag)?;
    let name = require_text("name", &payload.name)?;
    let category = require_text("category", &payload.category)?;
    let now = utc_now();

    let result = sqlx::query(
        "INSERT INTO assets (asset_tag, name, category, status, serial_number, notes, created_at, updated_at) \
         VALUES (?, ?, ?, 'Available', ?, ?, ?, ?)",
    )
    .bind(&asset_tag)
    .bind(&name)
    .bind(&category)
    .bind(&payload.serial_number)
    .bind(&payload.notes)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await;

    let id = match result {
        Ok(done) => done.last_insert_rowid(),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            return Err(AppError::conflict(format!("asset tag {asset_tag} already exists")));
        }
        Err(err) => return Err(err.into()),
    };

    let asset = fetch_asset(&state.pool, id).await?;
    log_activity(&state.event_bus, "created", Some(actor.id), &asset);

    Ok((StatusCode::CREATED, Json(asset)))
}

#[utoipa::path(
    get,
    path = "/assets/{id}",
    tag = "Assets",
    params(("id" = i64, Path, description = "Asset id")),
    responses((status = 200, description = "Asset detail", body = Asset))
)]
pub async fn get_asset(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<Json<Asset>> {
    require_permission(&state.policy, &actor, Permission::AssetsView)?;

    let asset = fetch_asset(&state.pool, id).await?;
    if actor.role.effective() == Role::Employee {
        let holds_asset = match actor.employee_id {
            Some(employee_id) => can_access_resolved(&actor.role, employee_id, asset.assigned_to, None),
            None => false,
        };
        if !holds_asset {
            return Err(AppError::forbidden("ownership of this asset", actor.role.label()));
        }
    }

    Ok(Json(asset))
}

#[utoipa::path(
    put,
    path = "/assets/{id}",
    tag = "Assets",
    params(("id" = i64, Path, description = "Asset id")),
    request_body = AssetUpdateRequest,
    responses((status = 200, description = "Asset updated", body = Asset))
)]
pub async fn update_asset(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(payload): Json<AssetUpdateRequest>,
) -> AppResult<Json<Asset>> {
    require_permission(&state.policy, &actor, Permission::AssetsUpdate)?;

    let old = fetch_asset(&state.pool, id).await?;
    let mut asset = old.clone();

    if let Some(name) = payload.name {
        asset.name = require_text("name", &name)?;
    }
    if let Some(category) = payload.category {
        asset.category = require_text("category", &category)?;
    }
    if let Some(status) = payload.status {
        asset.status = validate_asset_status(&status)?;
    }
    if payload.serial_number.is_some() {
        asset.serial_number = payload.serial_number;
    }
    if payload.notes.is_some() {
        asset.notes = payload.notes;
    }

    sqlx::query(
        "UPDATE assets SET name = ?, category = ?, status = ?, serial_number = ?, notes = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&asset.name)
    .bind(&asset.category)
    .bind(&asset.status)
    .bind(&asset.serial_number)
    .bind(&asset.notes)
    .bind(utc_now())
    .bind(id)
    .execute(&state.pool)
    .await?;

    let asset = fetch_asset(&state.pool, id).await?;
    log_activity_with_context(
        &state.event_bus,
        "updated",
        Some(actor.id),
        &asset,
        Some(&old),
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Json(asset))
}

#[utoipa::path(
    put,
    path = "/assets/{id}/assign",
    tag = "Assets",
    params(("id" = i64, Path, description = "Asset id")),
    request_body = AssetAssignRequest,
    responses((status = 200, description = "Asset assigned or returned", body = Asset))
)]
pub async fn assign_asset(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(payload): Json<AssetAssignRequest>,
) -> AppResult<Json<Asset>> {
    require_permission(&state.policy, &actor, Permission::AssetsAssign)?;

    let old = fetch_asset(&state.pool, id).await?;
    if old.status == "Retired" {
        return Err(AppError::conflict("retired assets cannot be assigned"));
    }

    let status = match payload.employee_id {
        Some(employee_id) => {
            fetch_employee(&state.pool, employee_id).await?;
            "In Use"
        }
        None => "Available",
    };

    sqlx::query("UPDATE assets SET assigned_to = ?, status = ?, updated_at = ? WHERE id = ?")
        .bind(payload.employee_id)
        .bind(status)
        .bind(utc_now())
        .bind(id)
        .execute(&state.pool)
        .await?;

    let asset = fetch_asset(&state.pool, id).await?;
    tracing::info!(asset_id = id, employee_id = ?payload.employee_id, "asset assignment changed");
    log_activity_with_context(&state.event_bus, "assigned", Some(actor.id), &asset, Some(&old), None);

    Ok(Json(asset))
}

#[utoipa::path(
    delete,
    path = "/assets/{id}",
    tag = "Assets",
    params(("id" = i64, Path, description = "Asset id")),
    responses((status = 204, description = "Asset soft deleted"))
)]
pub async fn delete_asset(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    require_permission(&state.policy, &actor, Permission::AssetsDelete)?;

    let asset = fetch_asset(&state.pool, id).await?;
    let now = utc_now();
    sqlx::query("UPDATE assets SET deleted_at = ?, updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&state.pool)
        .await?;

    log_activity(&state.event_bus, "deleted", Some(actor.id), &asset);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn fetch_asset(pool: &SqlitePool, id: i64) -> AppResult<Asset> {
    let sql = format!("SELECT {ASSET_COLUMNS} FROM assets WHERE id = ? AND deleted_at IS NULL");
    sqlx::query_as::<_, Asset>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("asset not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn asset(id: i64, assigned_to: Option<i64>) -> Asset {
        Asset {
            id,
            asset_tag: format!("A-{id}"),
            name: "Laptop".to_string(),
            category: "Laptop".to_string(),
            status: "In Use".to_string(),
            serial_number: None,
            assigned_to,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn employee_sees_only_their_assets() {
        let actor = Actor::new(1, Role::Employee).with_employee(10);
        let visible = visible_assets(vec![asset(1, Some(10)), asset(2, Some(11)), asset(3, None)], &actor);
        assert_eq!(visible.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn employee_without_record_sees_nothing() {
        let actor = Actor::new(1, Role::Employee);
        assert!(visible_assets(vec![asset(1, Some(10))], &actor).is_empty());
    }

    #[test]
    fn agent_sees_every_asset() {
        let actor = Actor::new(2, Role::Agent);
        assert_eq!(visible_assets(vec![asset(1, Some(10)), asset(2, None)], &actor).len(), 2);
    }
}
