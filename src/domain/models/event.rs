//! Inbound domain events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event name for ticket creation.
pub const TICKET_CREATED: &str = "ticket.created";

/// Payload of a `ticket.created` event.
///
/// The upstream transport may redeliver; `idempotency_key` identifies the
/// logical delivery and defaults to the ticket ID when the transport carries
/// no separate delivery ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketCreated {
    pub ticket_id: Uuid,
    pub title: String,
    pub description: String,
    pub created_by: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl TicketCreated {
    /// The key the run registry deduplicates on.
    pub fn dedup_key(&self) -> String {
        self.idempotency_key
            .clone()
            .unwrap_or_else(|| self.ticket_id.to_string())
    }
}

/// Wire envelope for inbound events: a name plus the event payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub name: String,
    pub data: TicketCreated,
}
