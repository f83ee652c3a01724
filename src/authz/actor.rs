use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sqlx::SqlitePool;

use super::role::{resolve_role, ResolvedRole};
use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;

/// The authenticated caller, rebuilt from the user record on every request.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: i64,
    pub name: String,
    pub role: ResolvedRole,
    pub employee_id: Option<i64>,
    pub manager_id: Option<i64>,
}

impl Actor {
    pub fn new(id: i64, role: impl Into<ResolvedRole>) -> Self {
        Self {
            id,
            name: String::new(),
            role: role.into(),
            employee_id: None,
            manager_id: None,
        }
    }

    pub fn with_employee(mut self, employee_id: i64) -> Self {
        self.employee_id = Some(employee_id);
        self
    }

    pub fn with_manager(mut self, manager_id: i64) -> Self {
        self.manager_id = Some(manager_id);
        self
    }
}

pub async fn load_actor(pool: &SqlitePool, user_id: i64) -> AppResult<Actor> {
    let row = sqlx::query_as::<_, (i64, String, String, Option<i64>, Option<i64>)>(
        "SELECT id, name, role, employee_id, manager_id FROM users WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let (id, name, role, employee_id, manager_id) =
        row.ok_or_else(|| AppError::unauthorized("session user no longer exists"))?;

    Ok(Actor {
        id,
        name,
        role: resolve_role(&role),
        employee_id,
        manager_id,
    })
}

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        load_actor(&state.pool, auth.user_id).await
    }
}
