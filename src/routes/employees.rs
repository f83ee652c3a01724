use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use sqlx::SqlitePool;

use crate::app::AppState;
use crate::authz::{require_permission, Actor, Permission};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity, log_activity_with_context, RequestContext};
use crate::models::employee::{Employee, EmployeeCreateRequest, EmployeeUpdateRequest, EMPLOYEE_COLUMNS};
use crate::utils::{require_text, utc_now};

#[utoipa::path(
    get,
    path = "/employees",
    tag = "Employees",
    responses((status = 200, description = "List employees", body = [Employee]))
)]
pub async fn list_employees(State(state): State<AppState>, actor: Actor) -> AppResult<Json<Vec<Employee>>> {
    require_permission(&state.policy, &actor, Permission::EmployeesView)?;

    let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE deleted_at IS NULL ORDER BY name");
    let employees = sqlx::query_as::<_, Employee>(&sql).fetch_all(&state.pool).await?;
    Ok(Json(employees))
}

#[utoipa::path(
    post,
    path = "/employees",
    tag = "Employees",
    request_body = EmployeeCreateRequest,
    responses((status = 201, description = "Employee created", body = Employee))
)]
pub async fn create_employee(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<EmployeeCreateRequest>,
) -> AppResult<(StatusCode, Json<Employee>)> {
    require_permission(&state.policy, &actor, Permission::EmployeesCreate)?;

    let name = require_text("name", &payload.name)?;
    let email = require_text("email", &payload.email)?;
    if let Some(manager_id) = payload.manager_id {
        fetch_employee(&state.pool, manager_id).await?;
    }

    let now = utc_now();
    let result = sqlx::query(
        "INSERT INTO employees (name, email, department, position, manager_id, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 'Active', ?, ?)",
    )
    .bind(&name)
    .bind(&email)
    .bind(&payload.department)
    .bind(&payload.position)
    .bind(payload.manager_id)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await;

    let id = match result {
        Ok(done) => done.last_insert_rowid(),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            return Err(AppError::conflict("employee email already in use"));
        }
        Err(err) => return Err(err.into()),
    };

    let employee = fetch_employee(&state.pool, id).await?;
    log_activity(&state.event_bus, "created", Some(actor.id), &employee);

    Ok((StatusCode::CREATED, Json(employee)))
}

#[utoipa::path(
    get,
    path = "/employees/{id}",
    tag = "Employees",
    params(("id" = i64, Path, description = "Employee id")),
    responses((status = 200, description = "Employee detail", body = Employee))
)]
pub async fn get_employee(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<Json<Employee>> {
    // Anyone may read their own employee record.
    if actor.employee_id != Some(id) {
        require_permission(&state.policy, &actor, Permission::EmployeesView)?;
    }
    Ok(Json(fetch_employee(&state.pool, id).await?))
}

#[utoipa::path(
    put,
    path = "/employees/{id}",
    tag = "Employees",
    params(("id" = i64, Path, description = "Employee id")),
    request_body = EmployeeUpdateRequest,
    responses((status = 200, description = "Employee updated", body = Employee))
)]
pub async fn update_employee(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(payload): Json<EmployeeUpdateRequest>,
) -> AppResult<Json<Employee>> {
    require_permission(&state.policy, &actor, Permission::EmployeesUpdate)?;

    let old = fetch_employee(&state.pool, id).await?;
    let mut employee = old.clone();

    let EmployeeUpdateRequest {
        name,
        email,
        department,
        position,
        manager_id,
        status,
    } = payload;

    if let Some(name) = name {
        employee.name = require_text("name", &name)?;
    }
    if let Some(email) = email {
        employee.email = require_text("email", &email)?;
    }
    if department.is_some() {
        employee.department = department;
    }
    if position.is_some() {
        employee.position = position;
    }
    if let Some(manager_id) = manager_id {
        if manager_id == id {
            return Err(AppError::bad_request("an employee cannot manage themselves"));
        }
        fetch_employee(&state.pool, manager_id).await?;
        employee.manager_id = Some(manager_id);
    }
    if let Some(status) = status {
        employee.status = match status.trim().to_ascii_lowercase().as_str() {
            "active" => "Active".to_string(),
            "inactive" => "Inactive".to_string(),
            _ => return Err(AppError::bad_request(format!("unknown employee status {status}"))),
        };
    }

    sqlx::query(
        "UPDATE employees SET name = ?, email = ?, department = ?, position = ?, manager_id = ?, status = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&employee.name)
    .bind(&employee.email)
    .bind(&employee.department)
    .bind(&employee.position)
    .bind(employee.manager_id)
    .bind(&employee.status)
    .bind(utc_now())
    .bind(id)
    .execute(&state.pool)
    .await?;

    let employee = fetch_employee(&state.pool, id).await?;
    log_activity_with_context(
        &state.event_bus,
        "updated",
        Some(actor.id),
        &employee,
        Some(&old),
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Json(employee))
}

#[utoipa::path(
    delete,
    path = "/employees/{id}",
    tag = "Employees",
    params(("id" = i64, Path, description = "Employee id")),
    responses((status = 204, description = "Employee soft deleted"))
)]
pub async fn delete_employee(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    require_permission(&state.policy, &actor, Permission::EmployeesDelete)?;

    let employee = fetch_employee(&state.pool, id).await?;
    let now = utc_now();

    let mut tx = state.pool.begin().await?;
    sqlx::query("UPDATE employees SET deleted_at = ?, status = 'Inactive', updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    // Hardware goes back to the pool when its holder leaves.
    sqlx::query("UPDATE assets SET assigned_to = NULL, status = 'Available', updated_at = ? WHERE assigned_to = ? AND deleted_at IS NULL")
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    log_activity(&state.event_bus, "deleted", Some(actor.id), &employee);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn fetch_employee(pool: &SqlitePool, id: i64) -> AppResult<Employee> {
    let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ? AND deleted_at IS NULL");
    sqlx::query_as::<_, Employee>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("employee not found"))
}
