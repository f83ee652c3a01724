use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::authz::{resolve_role, ResolvedRole, Role};
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum TicketStatus {
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::Resolved,
        TicketStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "Open",
            TicketStatus::InProgress => "In Progress",
            TicketStatus::Resolved => "Resolved",
            TicketStatus::Closed => "Closed",
        }
    }

    /// One step along Open -> In Progress -> Resolved -> Closed.
    pub fn next_step(&self) -> Option<TicketStatus> {
        match self {
            TicketStatus::Open => Some(TicketStatus::InProgress),
            TicketStatus::InProgress => Some(TicketStatus::Resolved),
            TicketStatus::Resolved => Some(TicketStatus::Closed),
            TicketStatus::Closed => None,
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "open" => Ok(TicketStatus::Open),
            "in progress" => Ok(TicketStatus::InProgress),
            "resolved" => Ok(TicketStatus::Resolved),
            "closed" => Ok(TicketStatus::Closed),
            _ => Err(format!("unknown ticket status {raw}")),
        }
    }
}

/// Agents and everything above them move tickets freely.
pub fn is_privileged(role: &ResolvedRole) -> bool {
    role.level() >= Role::Agent.level()
}

/// Where a ticket may go next for a given actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvailableTransitions {
    /// Privileged actor: every status, including re-opening a closed ticket.
    Any,
    /// Non-privileged actor: the single forward step.
    Forward(TicketStatus),
    /// Non-privileged actor on a closed ticket.
    Terminal,
    /// Current status is not one we know; only staying put is offered.
    Unrecognized(String),
}

impl AvailableTransitions {
    pub fn statuses(&self) -> Vec<String> {
        match self {
            AvailableTransitions::Any => TicketStatus::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            AvailableTransitions::Forward(next) => vec![next.as_str().to_string()],
            AvailableTransitions::Terminal => Vec::new(),
            AvailableTransitions::Unrecognized(current) => vec![current.clone()],
        }
    }

    pub fn allows(&self, target: TicketStatus) -> bool {
        match self {
            AvailableTransitions::Any => true,
            AvailableTransitions::Forward(next) => *next == target,
            AvailableTransitions::Terminal | AvailableTransitions::Unrecognized(_) => false,
        }
    }
}

pub fn available_transitions(current: &str, role: &ResolvedRole) -> AvailableTransitions {
    if is_privileged(role) {
        return AvailableTransitions::Any;
    }

    match current.parse::<TicketStatus>() {
        Ok(status) => match status.next_step() {
            Some(next) => AvailableTransitions::Forward(next),
            None => AvailableTransitions::Terminal,
        },
        Err(_) => {
            tracing::warn!(status = %current, "ticket has an unrecognized status");
            AvailableTransitions::Unrecognized(current.to_string())
        }
    }
}

pub fn calculate_available_transitions(current: &str, role: &str) -> AvailableTransitions {
    available_transitions(current, &resolve_role(role))
}

/// Rejects a status change the actor may not make. Runs before any write.
pub fn validate_transition(current: &str, target: TicketStatus, role: &ResolvedRole) -> AppResult<()> {
    if available_transitions(current, role).allows(target) {
        return Ok(());
    }
    Err(AppError::invalid_transition(current, target.as_str(), role.label()))
}
