//! Ticket record and the triage patch applied by a workflow run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a ticket.
///
/// Owned jointly by the workflow (`Open -> InProgress` on a successful
/// triage write) and by manual moderator action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Done,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority assigned by classification.
///
/// The reasoning collaborator speaks exactly `low|medium|high`; anything
/// else parses to `Unset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    #[default]
    Unset,
    Low,
    Medium,
    High,
}

impl TicketPriority {
    /// Parse the reasoning collaborator's priority keyword, case-insensitively.
    pub fn from_keyword(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => Self::Unset,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A support ticket as the workflow sees it.
///
/// `title` and `description` are immutable once created. The classification
/// fields (`priority`, `summary`, `helpful_notes`, `related_skills`) are
/// write-once per run: a run only moves them from `Unset`/empty to a concrete
/// value, and the store's version stamps keep an older run from clobbering a
/// newer run's write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub helpful_notes: Option<String>,
    #[serde(default)]
    pub related_skills: Vec<String>,
    /// Handler IDs in selection order.
    #[serde(default)]
    pub assigned_to: Vec<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Compare-and-swap stamp, bumped on every write.
    pub version: u64,
    /// Causal epoch of the newest workflow run that wrote this record.
    pub last_workflow_version: u64,
}

impl Ticket {
    pub fn new(title: impl Into<String>, description: impl Into<String>, created_by: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            status: TicketStatus::Open,
            priority: TicketPriority::Unset,
            summary: None,
            helpful_notes: None,
            related_skills: Vec::new(),
            assigned_to: Vec::new(),
            created_by,
            created_at: now,
            updated_at: now,
            version: 1,
            last_workflow_version: 0,
        }
    }
}

/// The fields a run writes back in its single persistence step.
///
/// `workflow_version` is the run's causal epoch; the store records it as
/// `last_workflow_version` so later runs can detect and drop stale writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriagePatch {
    pub priority: TicketPriority,
    pub summary: Option<String>,
    pub helpful_notes: Option<String>,
    pub related_skills: Vec<String>,
    pub assigned_to: Vec<Uuid>,
    pub status: TicketStatus,
    pub workflow_version: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_keyword_parsing() {
        assert_eq!(TicketPriority::from_keyword("high"), TicketPriority::High);
        assert_eq!(TicketPriority::from_keyword(" MEDIUM "), TicketPriority::Medium);
        assert_eq!(TicketPriority::from_keyword("Low"), TicketPriority::Low);
        assert_eq!(TicketPriority::from_keyword("urgent"), TicketPriority::Unset);
        assert_eq!(TicketPriority::from_keyword(""), TicketPriority::Unset);
    }

    #[test]
    fn test_new_ticket_defaults() {
        let ticket = Ticket::new("printer", "it is on fire", Uuid::new_v4());
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.priority, TicketPriority::Unset);
        assert!(ticket.assigned_to.is_empty());
        assert_eq!(ticket.version, 1);
        assert_eq!(ticket.last_workflow_version, 0);
    }

    #[test]
    fn test_status_serde_uses_snake_case() {
        let json = serde_json::to_string(&TicketStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
