use super::actor::Actor;
use super::permission::Permission;
use super::policy::{Decision, PermissionMap};
use super::role::{resolve_role, ResolvedRole};
use crate::errors::{AppError, AppResult};

/// Lets the request proceed only when the actor's role grants `permission`.
pub fn require_permission(policy: &PermissionMap, actor: &Actor, permission: Permission) -> AppResult<()> {
    let decision = policy.decide_resolved(&actor.role, permission);
    if let Decision::Unrecognized { raw, .. } = &decision {
        tracing::warn!(user_id = actor.id, role = %raw, permission = %permission, "permission evaluated with fallback role");
    }

    if decision.is_allowed() {
        return Ok(());
    }

    tracing::info!(user_id = actor.id, role = %actor.role.label(), permission = %permission, "permission denied");
    Err(AppError::forbidden(permission.as_str(), actor.role.label()))
}

/// Lets the request proceed only when the actor's level is at least `min_role`'s.
pub fn require_role_level(actor: &Actor, min_role: &str) -> AppResult<()> {
    let minimum = match resolve_role(min_role) {
        ResolvedRole::Known(role) => role,
        ResolvedRole::Unrecognized(raw) => {
            return Err(AppError::configuration(format!("unknown minimum role {raw}")));
        }
    };

    if actor.role.level() >= minimum.level() {
        return Ok(());
    }

    tracing::info!(user_id = actor.id, role = %actor.role.label(), required = %minimum, "role level too low");
    Err(AppError::forbidden(format!("role {minimum}"), actor.role.label()))
}
