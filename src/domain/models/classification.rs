//! Structured result of classifying a ticket.

use serde::{Deserialize, Serialize};

use super::ticket::TicketPriority;

/// What the reasoning collaborator is expected to produce for one ticket.
///
/// Missing fields in an otherwise-parseable response default individually,
/// so a partially useful answer is never discarded wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub summary: String,
    pub priority: TicketPriority,
    pub helpful_notes: String,
    pub related_skills: Vec<String>,
}

impl Classification {
    /// The safe default used when the reasoning collaborator fails for good:
    /// priority `Unset`, everything else empty. The pipeline keeps moving.
    pub fn fallback() -> Self {
        Self::default()
    }

    /// True if classification produced nothing usable.
    pub fn is_empty(&self) -> bool {
        self.priority == TicketPriority::Unset
            && self.summary.is_empty()
            && self.helpful_notes.is_empty()
            && self.related_skills.is_empty()
    }
}
