//! In-memory collaborator implementations, used by tests and the ingest CLI.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::models::{Handler, Ticket, TicketStatus, TriagePatch};
use crate::domain::ports::{HandlerDirectory, StoreError, TicketStore, WriteOutcome};

/// In-memory [`TicketStore`] with compare-and-swap semantics.
#[derive(Default)]
pub struct InMemoryTicketStore {
    tickets: RwLock<HashMap<Uuid, Ticket>>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, ticket: Ticket) {
        self.tickets
            .write()
            .expect("ticket store lock poisoned")
            .insert(ticket.id, ticket);
    }

    pub fn remove(&self, ticket_id: Uuid) -> Option<Ticket> {
        self.tickets
            .write()
            .expect("ticket store lock poisoned")
            .remove(&ticket_id)
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn get(&self, ticket_id: Uuid) -> Result<Option<Ticket>, StoreError> {
        Ok(self
            .tickets
            .read()
            .expect("ticket store lock poisoned")
            .get(&ticket_id)
            .cloned())
    }

    async fn apply_triage(
        &self,
        ticket_id: Uuid,
        patch: TriagePatch,
        expected_version: u64,
    ) -> Result<WriteOutcome, StoreError> {
        let mut tickets = self.tickets.write().expect("ticket store lock poisoned");
        let Some(ticket) = tickets.get_mut(&ticket_id) else {
            return Ok(WriteOutcome::NotFound);
        };
        if ticket.version != expected_version {
            return Ok(WriteOutcome::StaleVersion);
        }

        apply_patch(ticket, patch);
        ticket.version += 1;
        ticket.updated_at = Utc::now();
        Ok(WriteOutcome::Applied {
            new_version: ticket.version,
        })
    }
}

/// Write-once merge: classification fields only move from `Unset`/empty to a
/// concrete value; status only advances `Open -> InProgress`.
fn apply_patch(ticket: &mut Ticket, patch: TriagePatch) {
    if ticket.priority == crate::domain::models::TicketPriority::Unset {
        ticket.priority = patch.priority;
    }
    if ticket.summary.is_none() {
        ticket.summary = patch.summary;
    }
    if ticket.helpful_notes.is_none() {
        ticket.helpful_notes = patch.helpful_notes;
    }
    if ticket.related_skills.is_empty() {
        ticket.related_skills = patch.related_skills;
    }
    if ticket.assigned_to.is_empty() {
        ticket.assigned_to = patch.assigned_to;
    }
    if ticket.status == TicketStatus::Open && patch.status == TicketStatus::InProgress {
        ticket.status = patch.status;
    }
    ticket.last_workflow_version = ticket.last_workflow_version.max(patch.workflow_version);
}

/// In-memory [`HandlerDirectory`] snapshot, stable in insertion order.
#[derive(Default)]
pub struct InMemoryHandlerDirectory {
    handlers: RwLock<Vec<Handler>>,
}

impl InMemoryHandlerDirectory {
    pub fn new(handlers: Vec<Handler>) -> Self {
        Self {
            handlers: RwLock::new(handlers),
        }
    }

    pub fn push(&self, handler: Handler) {
        self.handlers
            .write()
            .expect("handler directory lock poisoned")
            .push(handler);
    }
}

impl HandlerDirectory for InMemoryHandlerDirectory {
    fn list_candidates(&self) -> Vec<Handler> {
        self.handlers
            .read()
            .expect("handler directory lock poisoned")
            .clone()
    }
}
