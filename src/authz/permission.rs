use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single allowed action on one resource category, written `resource:action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    EmployeesView,
    EmployeesCreate,
    EmployeesUpdate,
    EmployeesDelete,

    AssetsView,
    AssetsCreate,
    AssetsUpdate,
    AssetsDelete,
    AssetsAssign,

    TicketsView,
    TicketsCreate,
    TicketsUpdate,
    TicketsDelete,
    TicketsAssign,
    TicketsComment,

    UsersView,
    UsersManage,

    ReportsView,
    AuditView,
    SettingsManage,
}

impl Permission {
    pub const ALL: [Permission; 20] = [
        Permission::EmployeesView,
        Permission::EmployeesCreate,
        Permission::EmployeesUpdate,
        Permission::EmployeesDelete,
        Permission::AssetsView,
        Permission::AssetsCreate,
        Permission::AssetsUpdate,
        Permission::AssetsDelete,
        Permission::AssetsAssign,
        Permission::TicketsView,
        Permission::TicketsCreate,
        Permission::TicketsUpdate,
        Permission::TicketsDelete,
        Permission::TicketsAssign,
        Permission::TicketsComment,
        Permission::UsersView,
        Permission::UsersManage,
        Permission::ReportsView,
        Permission::AuditView,
        Permission::SettingsManage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::EmployeesView => "employees:view",
            Permission::EmployeesCreate => "employees:create",
            Permission::EmployeesUpdate => "employees:update",
            Permission::EmployeesDelete => "employees:delete",
            Permission::AssetsView => "assets:view",
            Permission::AssetsCreate => "assets:create",
            Permission::AssetsUpdate => "assets:update",
            Permission::AssetsDelete => "assets:delete",
            Permission::AssetsAssign => "assets:assign",
            Permission::TicketsView => "tickets:view",
            Permission::TicketsCreate => "tickets:create",
            Permission::TicketsUpdate => "tickets:update",
            Permission::TicketsDelete => "tickets:delete",
            Permission::TicketsAssign => "tickets:assign",
            Permission::TicketsComment => "tickets:comment",
            Permission::UsersView => "users:view",
            Permission::UsersManage => "users:manage",
            Permission::ReportsView => "reports:view",
            Permission::AuditView => "audit:view",
            Permission::SettingsManage => "settings:manage",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission: {0}")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let token = raw.trim();
        Permission::ALL
            .into_iter()
            .find(|perm| perm.as_str() == token)
            .ok_or_else(|| UnknownPermission(raw.to_string()))
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
