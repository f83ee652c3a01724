use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::app::AppState;
use crate::authz::{Actor, Role};
use crate::errors::{AppError, AppResult};
use crate::events::log_activity;
use crate::models::user::{AuthResponse, DbUser, LoginRequest, MeResponse, RegisterRequest, User, USER_COLUMNS};
use crate::utils::{hash_password, require_text, utc_now, verify_password};

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    message: String,
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    // Self-registration always lands on the lowest role.
    let user = insert_user(&state.pool, &payload.name, &payload.email, &payload.password, Role::Employee).await?;
    let token = state.jwt.encode(user.id)?;

    log_activity(&state.event_bus, "registered", Some(user.id), &user);

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ? AND deleted_at IS NULL");
    let db_user = sqlx::query_as::<_, DbUser>(&sql)
        .bind(payload.email.trim())
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::unauthorized("invalid credentials"))?;

    let password_ok = verify_password(&payload.password, &db_user.password_hash)?;
    if !password_ok {
        tracing::info!(email = %payload.email, "failed login");
        return Err(AppError::unauthorized("invalid credentials"));
    }

    let token = state.jwt.encode(db_user.id)?;
    let user: User = db_user.try_into()?;
    log_activity(&state.event_bus, "login", Some(user.id), &user);

    Ok(Json(AuthResponse { token, user }))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    responses((status = 200, description = "Current user and effective permissions", body = MeResponse))
)]
pub async fn me(State(state): State<AppState>, actor: Actor) -> AppResult<Json<MeResponse>> {
    let db_user = fetch_user_by_id(&state.pool, actor.id).await?;
    let user: User = db_user.try_into()?;
    let effective = actor.role.effective();
    let permissions = state
        .policy
        .tokens_for(effective)
        .into_iter()
        .map(str::to_string)
        .collect();

    Ok(Json(MeResponse {
        user,
        effective_role: effective.as_str().to_string(),
        permissions,
    }))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Logout acknowledged"))
)]
pub async fn logout(_actor: Actor) -> AppResult<Json<MessageResponse>> {
    Ok(Json(MessageResponse {
        message: "Logged out".to_string(),
    }))
}

/// Creates a login. Shared by registration, the admin CLI and tests.
pub async fn insert_user(pool: &SqlitePool, name: &str, email: &str, password: &str, role: Role) -> AppResult<User> {
    let name = require_text("name", name)?;
    let email = require_text("email", email)?;
    ensure_email_available(pool, &email).await?;

    let password_hash = hash_password(password)?;
    let now = utc_now();

    let user_id = sqlx::query(
        "INSERT INTO users (name, email, password_hash, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&name)
    .bind(&email)
    .bind(password_hash)
    .bind(role.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?
    .last_insert_rowid();

    tracing::info!(user_id, role = %role, "user created");
    fetch_user_by_id(pool, user_id).await?.try_into()
}

async fn ensure_email_available(pool: &SqlitePool, email: &str) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ? AND deleted_at IS NULL")
        .bind(email)
        .fetch_one(pool)
        .await?;

    if count > 0 {
        return Err(AppError::conflict("email already in use"));
    }

    Ok(())
}

pub async fn fetch_user_by_id(pool: &SqlitePool, user_id: i64) -> AppResult<DbUser> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ? AND deleted_at IS NULL");
    sqlx::query_as::<_, DbUser>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))
}
