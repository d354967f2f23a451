//! Triage run: one execution of the fixed step sequence for one ticket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The four steps of the triage sequence, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStep {
    Classify,
    Assign,
    Persist,
    Notify,
}

impl RunStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Classify => "classify",
            Self::Assign => "assign",
            Self::Persist => "persist",
            Self::Notify => "notify",
        }
    }
}

impl std::fmt::Display for RunStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-step status tracked on the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed { reason: String },
    /// Attempts exceeded or the step's own error was terminal.
    Exhausted,
}

/// Book-keeping for one step of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub status: StepStatus,
    pub attempts: u32,
}

impl Default for StepRecord {
    fn default() -> Self {
        Self {
            status: StepStatus::Pending,
            attempts: 0,
        }
    }
}

/// State of a run's progression through the step sequence.
///
/// ```text
/// Pending -> Classifying -> Assigning -> Persisting -> Notifying -> Succeeded
///                 |                          |
///            Retrying(n) ----------------Retrying(n)
///                 |                          |
///            (fallback, proceed)        Exhausted
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    /// Admitted, awaiting the first step.
    Pending,
    Classifying,
    Assigning,
    Persisting,
    Notifying,
    /// Same step, incremented attempt; backoff in progress.
    Retrying { step: RunStep, attempt: u32 },
    /// All steps reached a terminal per-step state.
    Succeeded,
    /// A step's retries ran out with no safe default to fall back to.
    Exhausted { step: RunStep },
    /// The ticket was deleted while the run was in flight.
    Cancelled,
}

impl RunState {
    /// Whether this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Exhausted { .. } | Self::Cancelled
        )
    }
}

/// Terminal outcome recorded in the run registry for dedup lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded {
        assigned: usize,
        notified: usize,
        notify_failed: usize,
        /// Whether the default classification had to be used.
        classification_defaulted: bool,
        /// Whether the persistence write was skipped as stale.
        write_skipped: bool,
    },
    Exhausted {
        step: RunStep,
    },
    Cancelled,
}

/// One execution attempt of the triage sequence for one ticket.
///
/// Mutated only by the step executor; at most one run per ticket is
/// non-terminal at any instant (enforced by the run registry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageRun {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub idempotency_key: String,
    /// Causal epoch, monotonic per ticket, assigned at admission.
    /// Stamped into the ticket record on write for stale-write rejection.
    pub epoch: u64,
    pub state: RunState,
    pub classify: StepRecord,
    pub assign: StepRecord,
    pub persist: StepRecord,
    pub notify: StepRecord,
    pub started_at: DateTime<Utc>,
}

impl TriageRun {
    pub fn new(ticket_id: Uuid, idempotency_key: String, epoch: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticket_id,
            idempotency_key,
            epoch,
            state: RunState::Pending,
            classify: StepRecord::default(),
            assign: StepRecord::default(),
            persist: StepRecord::default(),
            notify: StepRecord::default(),
            started_at: Utc::now(),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_state_terminal() {
        assert!(!RunState::Pending.is_terminal());
        assert!(!RunState::Retrying { step: RunStep::Classify, attempt: 2 }.is_terminal());
        assert!(RunState::Succeeded.is_terminal());
        assert!(RunState::Exhausted { step: RunStep::Persist }.is_terminal());
        assert!(RunState::Cancelled.is_terminal());
    }

    #[test]
    fn test_run_state_serde_roundtrip() {
        let state = RunState::Retrying {
            step: RunStep::Classify,
            attempt: 3,
        };
        let json = serde_json::to_string(&state).unwrap();
        let deserialized: RunState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, deserialized);
    }

    #[test]
    fn test_new_run_starts_pending() {
        let run = TriageRun::new(Uuid::new_v4(), "key".into(), 1);
        assert_eq!(run.state, RunState::Pending);
        assert_eq!(run.classify, StepRecord::default());
        assert_eq!(run.epoch, 1);
    }
}
