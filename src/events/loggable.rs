use serde::{Deserialize, Serialize};

/// Severity levels for activity logs. Controls retention and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Role and permission changes, deletions: never auto-deleted
    Critical,
    #[default]
    Important,
    /// Comments and similar chatter
    Noise,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Important => "important",
            Severity::Noise => "noise",
        }
    }
}

/// Entities that can be written to the activity log.
pub trait Loggable: Serialize + Send + Sync {
    /// Prefix of the event name, e.g. "ticket" in "ticket.created".
    fn entity_type() -> &'static str;

    fn subject_id(&self) -> i64;

    fn severity(&self) -> Severity {
        Severity::Important
    }

    fn severity_for_action(&self, action: &str) -> Severity {
        match action {
            "deleted" | "archived" => Severity::Critical,
            "created" | "updated" => self.severity(),
            _ => Severity::Important,
        }
    }
}
