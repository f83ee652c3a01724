use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Four-step scale shared by urgency, impact and the derived priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, ToSchema)]
pub enum Level {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Low, Level::Medium, Level::High, Level::Critical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Low => "Low",
            Level::Medium => "Medium",
            Level::High => "High",
            Level::Critical => "Critical",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Level::Low),
            "medium" => Ok(Level::Medium),
            "high" => Ok(Level::High),
            "critical" => Ok(Level::Critical),
            _ => Err(format!("unknown level {raw}")),
        }
    }
}

/// Derives priority from urgency and impact. First matching rule wins:
/// any Critical, then any High, then Low only when both are Low, else Medium.
pub fn calculate_priority(urgency: Level, impact: Level) -> Level {
    if urgency == Level::Critical || impact == Level::Critical {
        Level::Critical
    } else if urgency == Level::High || impact == Level::High {
        Level::High
    } else if urgency == Level::Low && impact == Level::Low {
        Level::Low
    } else {
        Level::Medium
    }
}
