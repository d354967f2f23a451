//! Ticket persistence port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::models::{Ticket, TriagePatch};
use crate::domain::ports::errors::StoreError;

/// Result of a compare-and-swap triage write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The patch was applied; the record now carries `new_version`.
    Applied { new_version: u64 },
    /// Someone else wrote since the expected version was read. The caller
    /// must drop the write, never retry it.
    StaleVersion,
    /// The ticket no longer exists.
    NotFound,
}

/// Repository port for the one record the workflow mutates.
///
/// The workflow performs a single compare-and-write per run; the version
/// stamp is the only concurrency control the ticket record needs.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Fetch the current ticket record.
    async fn get(&self, ticket_id: Uuid) -> Result<Option<Ticket>, StoreError>;

    /// Apply a triage patch if and only if the record's version still equals
    /// `expected_version`. Classification fields are write-once: the store
    /// only moves them from `Unset`/empty to a concrete value.
    async fn apply_triage(
        &self,
        ticket_id: Uuid,
        patch: TriagePatch,
        expected_version: u64,
    ) -> Result<WriteOutcome, StoreError>;
}
