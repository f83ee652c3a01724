use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub type AppResult<T> = Result<T, AppError>;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// No session or an unusable one. Clients should send the user to login.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The actor is known but lacks the permission or role level.
    #[error("forbidden: requires {required} (role: {role})")]
    Forbidden { required: String, role: String },
    #[error("invalid transition: {from} -> {to} is not allowed for role {role}")]
    InvalidTransition { from: String, to: String, role: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("token error: {0}")]
    Token(String),
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(required: impl Into<String>, role: impl Into<String>) -> Self {
        Self::Forbidden {
            required: required.into(),
            role: role.into(),
        }
    }

    pub fn invalid_transition(
        from: impl Into<String>,
        to: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
            role: role.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn token(err: impl Into<String>) -> Self {
        Self::Token(err.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Token(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden { .. } => "forbidden",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::BadRequest(_) => "bad_request",
            AppError::Configuration(_) => "configuration",
            AppError::Token(_) => "token",
            AppError::Database(_) => "database",
            AppError::Internal(_) => "internal",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    required: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let AppError::Database(err) = &self {
            tracing::error!(error = %err, "database error");
        }

        let (required, role) = match &self {
            AppError::Forbidden { required, role } => (Some(required.clone()), Some(role.clone())),
            AppError::InvalidTransition { role, .. } => (None, Some(role.clone())),
            _ => (None, None),
        };

        let payload = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
            required,
            role,
        };

        (status, Json(payload)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_and_authorization_map_to_distinct_statuses() {
        assert_eq!(AppError::unauthorized("no session").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::forbidden("tickets:assign", "employee").status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn forbidden_message_names_requirement_and_role() {
        let err = AppError::forbidden("assets:create", "agent");
        assert_eq!(err.to_string(), "forbidden: requires assets:create (role: agent)");
    }
}
