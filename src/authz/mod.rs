//! Authorization: the role-permission engine and its request guards.
//!
//! - Closed `Role` and `Permission` enums with string normalization at the edge
//! - A static, read-only `PermissionMap`
//! - Ownership and manager-hierarchy access to single records
//! - Guards returning 403 distinct from the extractor's 401

mod actor;
mod guard;
mod permission;
mod policy;
mod role;

pub use actor::{load_actor, Actor};
pub use guard::{require_permission, require_role_level};
pub use permission::{Permission, UnknownPermission};
pub use policy::{
    can_access_resolved, can_access_resource, filter_by_ownership, Decision, OwnedResource, PermissionMap,
};
pub use role::{resolve_role, role_level, ResolvedRole, Role, UnknownRole};

use std::sync::{Arc, OnceLock};

/// Process-wide policy, built on first use and read-only afterwards.
pub fn policy() -> Arc<PermissionMap> {
    static POLICY: OnceLock<Arc<PermissionMap>> = OnceLock::new();
    POLICY.get_or_init(|| Arc::new(PermissionMap::standard())).clone()
}

pub fn has_permission(role: &str, permission: Permission) -> bool {
    policy().has_permission(role, permission)
}
