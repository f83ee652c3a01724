use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Built-in roles, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Employee,
    Agent,
    Manager,
    Admin,
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::SuperAdmin,
        Role::Admin,
        Role::Manager,
        Role::Agent,
        Role::Employee,
    ];

    /// The role every unrecognized input collapses to.
    pub const LOWEST: Role = Role::Employee;

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Agent => "agent",
            Role::Employee => "employee",
        }
    }

    /// Hierarchy level, higher is more privileged. 0 is reserved for unknown roles.
    pub fn level(&self) -> u8 {
        match self {
            Role::SuperAdmin => 5,
            Role::Admin => 4,
            Role::Manager => 3,
            Role::Agent => 2,
            Role::Employee => 1,
        }
    }

    /// super_admin and admin get blanket access to every resource.
    pub fn is_administrative(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "super_admin" | "superadmin" => Ok(Role::SuperAdmin),
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "agent" => Ok(Role::Agent),
            "employee" => Ok(Role::Employee),
            _ => Err(UnknownRole(raw.to_string())),
        }
    }
}

/// Outcome of normalizing a role string that arrived from a session, a
/// database row or a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedRole {
    Known(Role),
    Unrecognized(String),
}

impl ResolvedRole {
    /// Role used for permission lookups. Unknown input is least privileged.
    pub fn effective(&self) -> Role {
        match self {
            ResolvedRole::Known(role) => *role,
            ResolvedRole::Unrecognized(_) => Role::LOWEST,
        }
    }

    pub fn level(&self) -> u8 {
        match self {
            ResolvedRole::Known(role) => role.level(),
            ResolvedRole::Unrecognized(_) => 0,
        }
    }

    pub fn is_recognized(&self) -> bool {
        matches!(self, ResolvedRole::Known(_))
    }

    /// Label for diagnostics; echoes the raw value when unrecognized.
    pub fn label(&self) -> &str {
        match self {
            ResolvedRole::Known(role) => role.as_str(),
            ResolvedRole::Unrecognized(raw) => raw.as_str(),
        }
    }
}

impl From<Role> for ResolvedRole {
    fn from(role: Role) -> Self {
        ResolvedRole::Known(role)
    }
}

pub fn resolve_role(raw: &str) -> ResolvedRole {
    match raw.parse::<Role>() {
        Ok(role) => ResolvedRole::Known(role),
        Err(UnknownRole(raw)) => {
            tracing::warn!(role = %raw, "unrecognized role, treating as least privileged");
            ResolvedRole::Unrecognized(raw)
        }
    }
}

pub fn role_level(raw: &str) -> u8 {
    resolve_role(raw).level()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_follow_hierarchy() {
        let levels: Vec<u8> = Role::ALL.iter().map(Role::level).collect();
        assert!(levels.windows(2).all(|pair| pair[0] > pair[1]));
        assert!(Role::SuperAdmin > Role::Admin);
        assert!(Role::Agent > Role::Employee);
    }

    #[test]
    fn parsing_is_case_insensitive() {
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(" Super-Admin ".parse::<Role>(), Ok(Role::SuperAdmin));
        assert_eq!("super admin".parse::<Role>(), Ok(Role::SuperAdmin));
        assert_eq!("Employee".parse::<Role>(), Ok(Role::Employee));
    }

    #[test]
    fn unknown_role_has_level_zero() {
        assert_eq!(role_level("wizard"), 0);
        assert_eq!(role_level(""), 0);
        assert_eq!(role_level("manager"), 3);
    }

    #[test]
    fn unknown_role_falls_back_to_employee() {
        let resolved = resolve_role("root");
        assert!(!resolved.is_recognized());
        assert_eq!(resolved.effective(), Role::Employee);
        assert_eq!(resolved.label(), "root");
    }

    #[test]
    fn round_trips_through_as_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
    }
}
