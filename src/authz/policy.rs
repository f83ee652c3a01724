use std::collections::{HashMap, HashSet};

use super::permission::Permission;
use super::role::{resolve_role, ResolvedRole, Role};

/// Result of a permission check.
///
/// `Unrecognized` means the role string did not normalize to a known role and
/// the check was evaluated against the least privileged role instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
    Unrecognized { raw: String, allowed: bool },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        match self {
            Decision::Allow => true,
            Decision::Deny => false,
            Decision::Unrecognized { allowed, .. } => *allowed,
        }
    }
}

/// Static role -> permission allow-sets. Built once and never mutated; a
/// reload must swap in a whole new map.
#[derive(Debug, Clone)]
pub struct PermissionMap {
    grants: HashMap<Role, HashSet<Permission>>,
}

impl PermissionMap {
    /// The documented SimpleIT policy table.
    pub fn standard() -> Self {
        use Permission::*;

        let everything: HashSet<Permission> = Permission::ALL.into_iter().collect();
        let admin: HashSet<Permission> = everything
            .iter()
            .copied()
            .filter(|perm| *perm != SettingsManage)
            .collect();

        let manager = [
            EmployeesView,
            AssetsView,
            AssetsAssign,
            TicketsView,
            TicketsCreate,
            TicketsUpdate,
            TicketsAssign,
            TicketsComment,
            UsersView,
            ReportsView,
        ];
        let agent = [
            EmployeesView,
            AssetsView,
            AssetsUpdate,
            TicketsView,
            TicketsCreate,
            TicketsUpdate,
            TicketsAssign,
            TicketsComment,
        ];
        let employee = [AssetsView, TicketsView, TicketsCreate, TicketsComment];

        let mut grants = HashMap::new();
        grants.insert(Role::SuperAdmin, everything);
        grants.insert(Role::Admin, admin);
        grants.insert(Role::Manager, manager.into_iter().collect());
        grants.insert(Role::Agent, agent.into_iter().collect());
        grants.insert(Role::Employee, employee.into_iter().collect());

        Self::from_grants(grants)
    }

    /// Builds a map from explicit grants. Roles without an entry get an empty set.
    pub fn from_grants(mut grants: HashMap<Role, HashSet<Permission>>) -> Self {
        for role in Role::ALL {
            grants.entry(role).or_default();
        }
        Self { grants }
    }

    pub fn permissions_for(&self, role: Role) -> &HashSet<Permission> {
        // every role is inserted by `from_grants`
        &self.grants[&role]
    }

    pub fn role_allows(&self, role: Role, permission: Permission) -> bool {
        self.permissions_for(role).contains(&permission)
    }

    pub fn decide_resolved(&self, role: &ResolvedRole, permission: Permission) -> Decision {
        let allowed = self.role_allows(role.effective(), permission);
        match role {
            ResolvedRole::Known(_) if allowed => Decision::Allow,
            ResolvedRole::Known(_) => Decision::Deny,
            ResolvedRole::Unrecognized(raw) => Decision::Unrecognized {
                raw: raw.clone(),
                allowed,
            },
        }
    }

    pub fn decide(&self, role: &str, permission: Permission) -> Decision {
        let decision = self.decide_resolved(&resolve_role(role), permission);
        tracing::debug!(role = %role, permission = %permission, ?decision, "permission check");
        decision
    }

    pub fn has_permission(&self, role: &str, permission: Permission) -> bool {
        self.decide(role, permission).is_allowed()
    }

    /// Sorted permission tokens for a role, as shown to clients.
    pub fn tokens_for(&self, role: Role) -> Vec<&'static str> {
        let mut tokens: Vec<&'static str> = self
            .permissions_for(role)
            .iter()
            .map(Permission::as_str)
            .collect();
        tokens.sort_unstable();
        tokens
    }
}

impl Default for PermissionMap {
    fn default() -> Self {
        Self::standard()
    }
}

/// Anything that can be narrowed to the records an actor submitted or is assigned to.
pub trait OwnedResource {
    fn submitter_id(&self) -> Option<i64>;
    fn assignee_id(&self) -> Option<i64>;
}

/// Access to a single record.
///
/// Grants when any of the following holds: the role is super_admin or admin,
/// the actor owns the record, or the actor is a manager and manages its owner.
pub fn can_access_resource(
    role: &str,
    actor_id: i64,
    owner_id: Option<i64>,
    manager_id: Option<i64>,
) -> bool {
    can_access_resolved(&resolve_role(role), actor_id, owner_id, manager_id)
}

pub fn can_access_resolved(
    role: &ResolvedRole,
    actor_id: i64,
    owner_id: Option<i64>,
    manager_id: Option<i64>,
) -> bool {
    let blanket = matches!(role, ResolvedRole::Known(r) if r.is_administrative());
    let owner = owner_id == Some(actor_id);
    let managed = matches!(role, ResolvedRole::Known(Role::Manager)) && manager_id == Some(actor_id);
    blanket || owner || managed
}

/// Narrows a collection to what the role may list.
///
/// Only the employee tier (and unknown roles) is filtered. Managers and agents
/// currently see the full collection; there is no team or department scoping.
pub fn filter_by_ownership<T: OwnedResource>(items: Vec<T>, role: &ResolvedRole, actor_id: i64) -> Vec<T> {
    match role.effective() {
        Role::SuperAdmin | Role::Admin | Role::Manager | Role::Agent => items,
        Role::Employee => items
            .into_iter()
            .filter(|item| {
                item.submitter_id() == Some(actor_id) || item.assignee_id() == Some(actor_id)
            })
            .collect(),
    }
}
